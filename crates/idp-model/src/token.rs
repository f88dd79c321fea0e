//! Issued grant artifacts: authorization codes, access tokens, refresh
//! tokens, and the server-side pending-authorization record for the consent
//! flow.
//!
//! Every artifact carries an opaque identifier as its primary key. A record
//! is usable only while `revoked == false` and `now < expires_at`;
//! revocation is logical, rows are never required to be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Scope;

/// PKCE code-challenge transformation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    /// The verifier is the challenge.
    #[serde(rename = "plain")]
    Plain,

    /// The challenge is base64url(SHA-256(verifier)).
    #[serde(rename = "S256")]
    S256,
}

/// A single-use authorization code awaiting exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// Opaque identifier; this is also the wire value of the code.
    pub id: String,

    /// Owning client.
    pub client_id: String,

    /// Owning user.
    pub user_id: i64,

    /// Scopes granted at authorization time.
    pub scopes: Vec<Scope>,

    /// Redirect URI the code was bound to; the exchange must present the
    /// same value.
    pub redirect_uri: String,

    /// PKCE challenge recorded at authorization time, if any.
    pub code_challenge: Option<String>,

    /// PKCE challenge method.
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// Logical revocation flag; set on first redemption.
    pub revoked: bool,

    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

/// An issued access token record.
///
/// The bearer artifact itself is a signed JWT; this row is its revocation
/// and audit anchor, keyed by the JWT's `jti`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque identifier, matching the JWT `jti` claim.
    pub id: String,

    /// Owning client.
    pub client_id: String,

    /// Owning user.
    pub user_id: i64,

    /// Granted scopes.
    pub scopes: Vec<Scope>,

    /// Logical revocation flag.
    pub revoked: bool,

    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

/// An issued refresh token record, chained to the access token it was
/// issued alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Opaque identifier; this is also the wire value of the refresh token.
    pub id: String,

    /// The access token this refresh token was issued with. Revoking that
    /// access token implicitly invalidates this refresh token.
    pub access_token_id: String,

    /// Owning client.
    pub client_id: String,

    /// Owning user.
    pub user_id: i64,

    /// Logical revocation flag.
    pub revoked: bool,

    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

macro_rules! usable_impl {
    ($ty:ty) => {
        impl $ty {
            /// Whether this record can still be redeemed at `now`.
            #[must_use]
            pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
                !self.revoked && now < self.expires_at
            }
        }
    };
}

usable_impl!(AuthorizationCode);
usable_impl!(AccessToken);
usable_impl!(RefreshToken);

/// Serialized state of an authorization attempt awaiting user consent.
///
/// Stored server-side keyed by an opaque consent token handed to the
/// browser; never shared across sessions. The struct is versioned so stale
/// session state from older releases is discarded instead of misread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Struct layout version.
    pub version: u8,

    /// Requesting client.
    pub client_id: String,

    /// Scopes after finalization against the client's allowed set.
    pub scopes: Vec<Scope>,

    /// Validated redirect URI.
    pub redirect_uri: String,

    /// Response mode for the redirect; only `query` is issued.
    pub response_mode: String,

    /// Opaque RP state, echoed back unmodified.
    pub state: Option<String>,

    /// PKCE challenge to carry onto the authorization code.
    pub code_challenge: Option<String>,

    /// PKCE challenge method.
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// Creation time; abandoned entries expire.
    pub created_at: DateTime<Utc>,
}

impl PendingAuthorization {
    /// Current struct layout version.
    pub const VERSION: u8 = 1;

    /// Whether this pending request has outlived `ttl`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn token_usability_window() {
        let now = Utc::now();
        let token = AccessToken {
            id: "t1".to_string(),
            client_id: "c1".to_string(),
            user_id: 1,
            scopes: vec![Scope::OpenId],
            revoked: false,
            expires_at: now + Duration::minutes(60),
        };

        assert!(token.is_usable(now));
        assert!(!token.is_usable(now + Duration::minutes(61)));

        let revoked = AccessToken {
            revoked: true,
            ..token
        };
        assert!(!revoked.is_usable(now));
    }

    #[test]
    fn pending_authorization_expiry() {
        let pending = PendingAuthorization {
            version: PendingAuthorization::VERSION,
            client_id: "c1".to_string(),
            scopes: vec![Scope::OpenId],
            redirect_uri: "https://rp.example.com/cb".to_string(),
            response_mode: "query".to_string(),
            state: None,
            code_challenge: None,
            code_challenge_method: None,
            created_at: Utc::now() - Duration::minutes(15),
        };

        assert!(pending.is_expired(Utc::now(), Duration::minutes(10)));
        assert!(!pending.is_expired(Utc::now(), Duration::minutes(20)));
    }
}
