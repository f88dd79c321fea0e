//! Discovery and JWKS endpoint handlers.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{error_response, OidcState};
use crate::discovery::ProviderMetadata;
use crate::error::OidcError;

/// `GET /.well-known/openid-configuration`
pub async fn discovery_get(State(state): State<OidcState>) -> Response {
    // The advertised ID-token algorithm is whatever the active key signs
    // with, which may lazily create the first keypair.
    let keypair = match state.keys.active_keypair().await {
        Ok(keypair) => keypair,
        Err(err) => return error_response(&OidcError::ServerError(err.to_string())),
    };

    let metadata = ProviderMetadata::build(&state.issuer.config().issuer, keypair.algorithm());
    Json(metadata).into_response()
}

/// `GET /oidc/jwks`
pub async fn jwks_get(State(state): State<OidcState>) -> Response {
    match state.keys.jwks().await {
        Ok(jwks) => Json(jwks).into_response(),
        Err(err) => error_response(&OidcError::ServerError(err.to_string())),
    }
}
