//! OAuth2 client application registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use idp_crypto::{constant_time_eq, generate_client_secret, sha256_hex};

use crate::identity::Scope;

/// A registered OAuth2 relying party.
///
/// The client secret is stored only as a SHA-256 digest; the plaintext is
/// returned exactly once from [`ClientApplication::new`] or
/// [`ClientApplication::regenerate_secret`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientApplication {
    /// Globally unique client identifier.
    pub client_id: String,

    /// Display name shown on the consent screen.
    pub name: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// SHA-256 digest of the client secret, hex-encoded.
    #[serde(skip_serializing)]
    pub client_secret_hash: String,

    /// Registered redirect URIs; authorization requests must match one
    /// exactly.
    pub redirect_uris: Vec<String>,

    /// Scopes this client may be granted. Always contains `openid`.
    pub allowed_scopes: Vec<Scope>,

    /// Whether the client may be used at all.
    pub is_active: bool,

    /// Whether the consent prompt is skipped for this client.
    pub skip_consent: bool,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ClientApplication {
    /// Creates a new client with a freshly generated secret.
    ///
    /// Returns the application together with the plaintext secret, which is
    /// not recoverable afterwards. The `openid` scope is added to
    /// `allowed_scopes` if missing.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        redirect_uris: Vec<String>,
        mut allowed_scopes: Vec<Scope>,
    ) -> (Self, String) {
        if !allowed_scopes.contains(&Scope::OpenId) {
            allowed_scopes.insert(0, Scope::OpenId);
        }

        let secret = generate_client_secret();
        let app = Self {
            client_id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            client_secret_hash: sha256_hex(secret.as_bytes()),
            redirect_uris,
            allowed_scopes,
            is_active: true,
            skip_consent: false,
            created_at: Utc::now(),
        };

        (app, secret)
    }

    /// Replaces the client secret, returning the new plaintext exactly once.
    pub fn regenerate_secret(&mut self) -> String {
        let secret = generate_client_secret();
        self.client_secret_hash = sha256_hex(secret.as_bytes());
        secret
    }

    /// Verifies a presented client secret against the stored digest in
    /// constant time.
    #[must_use]
    pub fn verify_secret(&self, secret: &str) -> bool {
        constant_time_eq(
            self.client_secret_hash.as_bytes(),
            sha256_hex(secret.as_bytes()).as_bytes(),
        )
    }

    /// Checks whether a redirect URI exactly matches a registered one.
    #[must_use]
    pub fn allows_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }
}
