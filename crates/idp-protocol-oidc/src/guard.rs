//! Bearer token validation for protected endpoints.
//!
//! The verifier is re-derived from the signing key the token names in its
//! `kid` header, so tokens remain checkable across rotations and algorithm
//! changes. Any parse, signature, expiry, or revocation failure yields an
//! `access_denied`-class error with a descriptive message.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use idp_model::Scope;
use idp_storage::TokenStore;

use crate::error::{OidcError, OidcResult};
use crate::jwt::UnverifiedJwt;
use crate::keyring::KeyManager;

/// The authenticated context a valid bearer token grants a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The revocation-record id (`jti`).
    pub token_id: String,

    /// The subject's directory id.
    pub user_id: i64,

    /// The client the token was issued to.
    pub client_id: String,

    /// Granted scopes.
    pub scopes: Vec<Scope>,
}

/// Validates bearer access tokens.
pub struct BearerValidator {
    keys: Arc<KeyManager>,
    tokens: Arc<dyn TokenStore>,
}

impl BearerValidator {
    /// Creates a bearer validator.
    pub fn new(keys: Arc<KeyManager>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { keys, tokens }
    }

    /// Validates an `Authorization` header value and returns the request
    /// context on success.
    ///
    /// # Errors
    ///
    /// Returns `access_denied` for a missing header, malformed token, bad
    /// signature, expired token, or revoked token.
    pub async fn validate(&self, authorization: Option<&str>) -> OidcResult<AuthContext> {
        let header = authorization.ok_or_else(|| {
            OidcError::AccessDenied("missing \"Authorization\" header".to_string())
        })?;

        let jwt = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OidcError::AccessDenied("missing bearer token".to_string()))?;

        let token = UnverifiedJwt::parse(jwt)?;

        let kid = token
            .header
            .kid
            .clone()
            .ok_or_else(|| OidcError::AccessDenied("token has no kid header".to_string()))?;

        let record = self
            .keys
            .verification_key(&kid)
            .await
            .map_err(|e| OidcError::ServerError(e.to_string()))?
            .ok_or_else(|| OidcError::AccessDenied(format!("unknown signing key: {kid}")))?;

        token.verify_signature(record.algorithm, &record.public_key_der)?;
        token.validate_time_claims(Utc::now().timestamp())?;

        let token_id = token.string_claim("jti")?;
        if self.tokens.is_access_token_revoked(&token_id).await? {
            return Err(OidcError::AccessDenied(
                "access token has been revoked".to_string(),
            ));
        }

        let user_id = token
            .string_claim("sub")?
            .parse::<i64>()
            .map_err(|_| OidcError::AccessDenied("malformed subject claim".to_string()))?;
        let client_id = token.string_claim("aud")?;

        let scopes = token
            .claims
            .get("scopes")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| Scope::parse(s).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(AuthContext {
            token_id,
            user_id,
            client_id,
            scopes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenConfig, TokenIssuer};
    use idp_crypto::SignatureAlgorithm;
    use idp_storage::MemoryStore;

    struct Fixture {
        issuer: TokenIssuer,
        validator: BearerValidator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyManager::new(store.clone(), SignatureAlgorithm::Es256));
        Fixture {
            issuer: TokenIssuer::new(TokenConfig::default(), keys.clone(), store.clone()),
            validator: BearerValidator::new(keys, store),
        }
    }

    #[tokio::test]
    async fn valid_token_yields_context() {
        let f = fixture();
        let (record, jwt) = f
            .issuer
            .issue_access_token("client-1", 42, vec![Scope::OpenId, Scope::Email])
            .await
            .unwrap();

        let header = format!("Bearer {jwt}");
        let ctx = f.validator.validate(Some(&header)).await.unwrap();

        assert_eq!(ctx.token_id, record.id);
        assert_eq!(ctx.user_id, 42);
        assert_eq!(ctx.client_id, "client-1");
        assert_eq!(ctx.scopes, vec![Scope::OpenId, Scope::Email]);
    }

    #[tokio::test]
    async fn missing_header_is_access_denied() {
        let f = fixture();
        let err = f.validator.validate(None).await.unwrap_err();
        assert!(matches!(err, OidcError::AccessDenied(_)));

        let err = f.validator.validate(Some("Basic abc")).await.unwrap_err();
        assert!(matches!(err, OidcError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let f = fixture();
        let (record, jwt) = f
            .issuer
            .issue_access_token("client-1", 42, vec![Scope::OpenId])
            .await
            .unwrap();

        f.issuer.revoke_access_token(&record.id).await.unwrap();

        let header = format!("Bearer {jwt}");
        let err = f.validator.validate(Some(&header)).await.unwrap_err();
        assert!(err.to_string().contains("revoked"));
    }

    #[tokio::test]
    async fn garbage_token_is_access_denied() {
        let f = fixture();
        let err = f
            .validator
            .validate(Some("Bearer not.a.token"))
            .await
            .unwrap_err();
        assert!(matches!(err, OidcError::AccessDenied(_)));
    }
}
