//! `OpenID` Provider discovery metadata.
//!
//! Served from `/.well-known/openid-configuration`. The supported claim
//! list is read from the same static scope → claim table the claim filter
//! uses, so discovery can never drift from what tokens actually carry.

use serde::{Deserialize, Serialize};

use idp_crypto::SignatureAlgorithm;
use idp_model::{identity, Scope};

/// `OpenID` Provider Metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    pub issuer: String,

    /// Authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Token endpoint URL.
    pub token_endpoint: String,

    /// `UserInfo` endpoint URL.
    pub userinfo_endpoint: String,

    /// JWKS document URL.
    pub jwks_uri: String,

    /// Supported scopes.
    pub scopes_supported: Vec<String>,

    /// Supported response types; only `code`.
    pub response_types_supported: Vec<String>,

    /// Supported response modes; only `query`.
    pub response_modes_supported: Vec<String>,

    /// Supported grant types.
    pub grant_types_supported: Vec<String>,

    /// Supported subject types; only `public`.
    pub subject_types_supported: Vec<String>,

    /// Signing algorithms for ID tokens: the active key's algorithm.
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// Supported token endpoint client authentication methods.
    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Every claim a token may carry.
    pub claims_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Builds the discovery document for an issuer whose active key signs
    /// with `active_algorithm`.
    #[must_use]
    pub fn build(issuer: &str, active_algorithm: SignatureAlgorithm) -> Self {
        let base = issuer.trim_end_matches('/');

        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{base}/oauth2/authorize"),
            token_endpoint: format!("{base}/oauth2/token"),
            userinfo_endpoint: format!("{base}/oidc/userinfo"),
            jwks_uri: format!("{base}/oidc/jwks"),
            scopes_supported: Scope::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            response_types_supported: vec!["code".to_string()],
            response_modes_supported: vec!["query".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec![active_algorithm.jwa_name().to_string()],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
            ],
            claims_supported: identity::supported_claim_names()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}
