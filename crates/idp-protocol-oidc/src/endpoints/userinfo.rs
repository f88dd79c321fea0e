//! `UserInfo` endpoint handler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;

use idp_model::{IdentityClaims, Scope};

use super::{error_response, OidcState};
use crate::error::OidcError;

/// `GET /oidc/userinfo`
///
/// Returns the scope-filtered claims of the token's subject. Requires a
/// bearer access token carrying the `openid` scope.
pub async fn userinfo_get(State(state): State<OidcState>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    let context = match state.bearer.validate(authorization).await {
        Ok(context) => context,
        Err(ref err) => return error_response(err),
    };

    if !context.scopes.contains(&Scope::OpenId) {
        return error_response(&OidcError::InsufficientScope(
            "openid scope is required for userinfo".to_string(),
        ));
    }

    let user = match state.directory.get_user(context.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return error_response(&OidcError::AccessDenied(
                "token subject no longer exists".to_string(),
            ));
        }
        Err(err) => return error_response(&OidcError::from(err)),
    };

    let claims = IdentityClaims::for_user(&user, &state.issuer.config().site_domain)
        .filter(&context.scopes);

    Json(claims).into_response()
}
