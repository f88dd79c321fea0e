//! Application state wiring.

use std::sync::Arc;

use idp_protocol_oidc::endpoints::OidcState;
use idp_protocol_oidc::{Authorizer, BearerValidator, GrantHandler, KeyManager, TokenIssuer};
use idp_protocol_saml::endpoints::SamlState;
use idp_storage::MemoryStore;

use crate::config::ServerConfig;

/// The composed application state.
///
/// The in-memory store stands in for every collaborator: entity storage,
/// the host directory, and the host session provider. A deployment against
/// a real host application swaps in its own implementations of the storage
/// traits.
#[derive(Clone)]
pub struct AppState {
    /// Backing store, exposed for seeding users, clients, and SAML
    /// registrations.
    pub store: Arc<MemoryStore>,

    /// OIDC endpoint state.
    pub oidc: OidcState,

    /// SAML endpoint state.
    pub saml: SamlState,
}

impl AppState {
    /// Wires everything from a configuration.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());

        let keys = Arc::new(KeyManager::new(store.clone(), config.default_algorithm));

        let token_config = idp_protocol_oidc::TokenConfig {
            issuer: config.issuer.clone(),
            site_domain: config.site_domain.clone(),
            access_token_lifetime: config.access_token_lifetime,
            refresh_token_lifetime: config.refresh_token_lifetime,
            id_token_lifetime: config.id_token_lifetime,
            ..idp_protocol_oidc::TokenConfig::default()
        };

        let issuer = Arc::new(TokenIssuer::new(token_config, keys.clone(), store.clone()));
        let authorizer = Arc::new(Authorizer::new(
            store.clone(),
            store.clone(),
            issuer.clone(),
        ));
        let grants = Arc::new(GrantHandler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            issuer.clone(),
        ));
        let bearer = Arc::new(BearerValidator::new(keys.clone(), store.clone()));

        let oidc = OidcState {
            keys,
            issuer,
            authorizer,
            grants,
            bearer,
            directory: store.clone(),
            sessions: store.clone(),
            session_cookie: config.session_cookie.clone(),
        };

        let base = config.issuer.trim_end_matches('/');
        let saml = SamlState {
            applications: store.clone(),
            directory: store.clone(),
            sessions: store.clone(),
            idp_entity_id: format!("{base}/saml/idp"),
            base_url: base.to_string(),
            site_domain: config.site_domain.clone(),
            session_cookie: config.session_cookie.clone(),
        };

        Self { store, oidc, saml }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_wires_and_serves_keys() {
        let state = AppState::new(&ServerConfig::default());
        let keypair = state.oidc.keys.active_keypair().await.unwrap();
        assert_eq!(
            keypair.algorithm(),
            idp_crypto::SignatureAlgorithm::Rs256
        );
        assert_eq!(
            state.saml.idp_entity_id,
            "http://localhost:8000/saml/idp"
        );
    }
}
