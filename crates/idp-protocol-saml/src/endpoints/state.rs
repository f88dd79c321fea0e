//! Shared state for the SAML endpoints.

use std::sync::Arc;

use idp_storage::{SamlApplicationStore, SessionProvider, UserDirectory};

/// Everything the SAML handlers need, wired once at startup.
#[derive(Clone)]
pub struct SamlState {
    /// Service provider registrations.
    pub applications: Arc<dyn SamlApplicationStore>,

    /// Host directory.
    pub directory: Arc<dyn UserDirectory>,

    /// Host browser sessions.
    pub sessions: Arc<dyn SessionProvider>,

    /// This IdP's entity id (issuer URI in responses and metadata).
    pub idp_entity_id: String,

    /// Public base URL, used to derive per-application SSO/SLO endpoints
    /// in metadata.
    pub base_url: String,

    /// Site domain used to synthesize email attributes.
    pub site_domain: String,

    /// Name of the host application's session cookie.
    pub session_cookie: String,
}

impl SamlState {
    /// The SSO endpoint URL for an application.
    #[must_use]
    pub fn sso_url(&self, application_id: i64) -> String {
        format!(
            "{}/saml/{application_id}/sso",
            self.base_url.trim_end_matches('/')
        )
    }

    /// The SLO endpoint URL for an application.
    #[must_use]
    pub fn slo_url(&self, application_id: i64) -> String {
        format!(
            "{}/saml/{application_id}/slo",
            self.base_url.trim_end_matches('/')
        )
    }
}
