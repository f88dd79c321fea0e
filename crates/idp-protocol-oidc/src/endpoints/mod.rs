//! Axum HTTP handlers for the OAuth2/OIDC endpoints.

mod authorization;
mod discovery;
mod state;
mod token;
mod userinfo;

pub use authorization::{approve_post, authorize_get, ApprovalForm};
pub use discovery::{discovery_get, jwks_get};
pub use state::OidcState;
pub use token::token_post;
pub use userinfo::userinfo_get;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::OidcError;

/// Builds the OAuth2/OIDC router.
pub fn router(state: OidcState) -> Router {
    Router::new()
        .route("/.well-known/openid-configuration", get(discovery_get))
        .route("/oidc/jwks", get(jwks_get))
        .route("/oidc/userinfo", get(userinfo_get))
        .route("/oauth2/authorize", get(authorize_get).post(approve_post))
        .route("/oauth2/token", post(token_post))
        .with_state(state)
}

/// Converts a protocol error into the JSON error response, adding a
/// `WWW-Authenticate` challenge on 401s.
pub(crate) fn error_response(err: &OidcError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(err.to_error_response());

    if status == StatusCode::UNAUTHORIZED {
        return (
            status,
            [(
                "WWW-Authenticate",
                format!(
                    "Bearer error=\"{}\", error_description=\"{}\"",
                    err.error_code(),
                    err.to_string().replace('"', "'")
                ),
            )],
            body,
        )
            .into_response();
    }

    (status, body).into_response()
}

/// Extracts a named cookie from the request headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    for pair in cookies.split(';') {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}

/// Resolves the authenticated host-session principal.
///
/// The host application authenticates the browser; this only maps its
/// session cookie to a directory user id.
pub(crate) async fn principal(state: &OidcState, headers: &HeaderMap) -> Result<i64, OidcError> {
    let session = cookie_value(headers, &state.session_cookie)
        .ok_or_else(|| OidcError::AccessDenied("authentication required".to_string()))?;

    state
        .sessions
        .user_for_session(&session)
        .await?
        .ok_or_else(|| OidcError::AccessDenied("authentication required".to_string()))
}

/// Escapes HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "a=1; seat_session=abc123; b=2".parse().unwrap());

        assert_eq!(
            cookie_value(&headers, "seat_session").as_deref(),
            Some("abc123")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }
}
