//! SAML service provider registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered SAML 2.0 service provider.
///
/// Each registration carries its own IdP signing credential: a self-signed
/// X.509 certificate and RSA private key generated once at creation and
/// immutable for the life of the registration. This is distinct from the
/// OIDC signing keys and has no rotation path; re-creating the application
/// rotates the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlServiceProvider {
    /// Local registration id, used in endpoint paths.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// The relying party's entity id (issuer URI); unique.
    pub entity_id: String,

    /// Assertion Consumer Service URL used when the request names none.
    pub acs_url: String,

    /// Single Logout URL, if the SP supports SLO.
    pub slo_url: Option<String>,

    /// The SP's signature-verification certificate as base64 DER (no PEM
    /// headers). When present, redirect-binding requests are verified
    /// against it.
    pub certificate: Option<String>,

    /// Where the SP's metadata was fetched from, if it was.
    pub metadata_url: Option<String>,

    /// NameID format URI issued to this SP.
    pub name_id_format: String,

    /// Whether SSO/SLO may be processed for this SP.
    pub is_active: bool,

    /// This IdP's signing certificate for the SP, base64 DER.
    pub idp_certificate: String,

    /// This IdP's signing key for the SP, PEM.
    #[serde(skip_serializing)]
    pub idp_private_key_pem: String,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl SamlServiceProvider {
    /// Resolves the SLO destination: the SP-configured URL unless the
    /// request supplies an explicit one.
    #[must_use]
    pub fn logout_destination<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested.or(self.slo_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sp() -> SamlServiceProvider {
        SamlServiceProvider {
            id: 1,
            name: "wiki".to_string(),
            entity_id: "https://wiki.example.com/saml".to_string(),
            acs_url: "https://wiki.example.com/saml/acs".to_string(),
            slo_url: Some("https://wiki.example.com/saml/slo".to_string()),
            certificate: None,
            metadata_url: None,
            name_id_format: "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent".to_string(),
            is_active: true,
            idp_certificate: String::new(),
            idp_private_key_pem: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn logout_destination_prefers_request() {
        let sp = sample_sp();
        assert_eq!(
            sp.logout_destination(Some("https://wiki.example.com/other")),
            Some("https://wiki.example.com/other")
        );
        assert_eq!(
            sp.logout_destination(None),
            Some("https://wiki.example.com/saml/slo")
        );
    }

    #[test]
    fn logout_destination_absent_when_unconfigured() {
        let mut sp = sample_sp();
        sp.slo_url = None;
        assert_eq!(sp.logout_destination(None), None);
    }
}
