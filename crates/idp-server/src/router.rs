//! Top-level router.

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Merges the protocol routers into the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(idp_protocol_oidc::endpoints::router(state.oidc))
        .merge(idp_protocol_saml::endpoints::router(state.saml))
}

async fn health() -> &'static str {
    "ok"
}
