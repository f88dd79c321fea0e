//! Axum HTTP handlers for the SAML endpoints.

mod metadata;
mod slo;
mod sso;
mod state;

pub use metadata::metadata_get;
pub use slo::{process_slo, slo_get, slo_post};
pub use sso::{process_sso, sso_get, sso_post, SamlDelivery, SamlMessageParams};
pub use state::SamlState;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::SamlError;

/// Builds the SAML router.
pub fn router(state: SamlState) -> Router {
    Router::new()
        .route("/saml/:application/sso", get(sso_get).post(sso_post))
        .route("/saml/:application/slo", get(slo_get).post(slo_post))
        .route("/saml/applications/:application/metadata", get(metadata_get))
        .with_state(state)
}

/// Renders a SAML error as a plain HTTP abort with status and message.
pub(crate) fn error_response(err: &SamlError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>SAML Error</title></head>
<body>
<h1>SAML Error</h1>
<p>{}</p>
</body>
</html>"#,
        crate::response::xml_escape(&err.to_string())
    );
    (status, Html(html)).into_response()
}

/// Extracts the host session cookie, if the browser carried one.
pub(crate) fn session_cookie(state: &SamlState, headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    for pair in cookies.split(';') {
        let (key, value) = pair.trim().split_once('=')?;
        if key == state.session_cookie {
            return Some(value.to_string());
        }
    }
    None
}

/// Resolves the authenticated host-session principal.
pub(crate) async fn principal(state: &SamlState, headers: &HeaderMap) -> Result<i64, SamlError> {
    let session = session_cookie(state, headers).ok_or(SamlError::AuthenticationRequired)?;

    state
        .sessions
        .user_for_session(&session)
        .await?
        .ok_or(SamlError::AuthenticationRequired)
}
