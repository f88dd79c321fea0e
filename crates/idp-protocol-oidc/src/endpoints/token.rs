//! Token endpoint handler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use super::{error_response, OidcState};
use crate::grants::{ClientCredentials, TokenRequest};

/// `POST /oauth2/token`
///
/// Redeems an authorization code or refresh token. Clients authenticate
/// via `client_secret_basic` or `client_secret_post`.
pub async fn token_post(
    State(state): State<OidcState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    let credentials = match ClientCredentials::extract(authorization, &request) {
        Ok(credentials) => credentials,
        Err(ref err) => return error_response(err),
    };

    match state.grants.handle(&credentials, &request).await {
        Ok(response) => Json(response).into_response(),
        Err(ref err) => error_response(err),
    }
}
