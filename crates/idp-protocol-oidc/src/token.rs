//! Token issuance.
//!
//! [`TokenIssuer`] mints and records authorization codes, access tokens,
//! refresh tokens, and OIDC ID tokens. Access tokens are signed JWTs whose
//! `jti` anchors the revocation record; codes and refresh tokens travel as
//! their opaque identifiers.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use idp_model::{
    AccessToken, AuthorizationCode, CodeChallengeMethod, DirectoryUser, IdentityClaims,
    RefreshToken, Scope,
};
use idp_storage::TokenStore;

use crate::error::OidcResult;
use crate::jwt::sign_claims;
use crate::keyring::KeyManager;

/// Token issuance configuration. Lifetimes are minutes.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer URL, the `iss` claim of every issued token.
    pub issuer: String,

    /// Site domain used to synthesize email claims.
    pub site_domain: String,

    /// Access token lifetime (default 60 minutes).
    pub access_token_lifetime: i64,

    /// Refresh token lifetime (default 10080 minutes, 7 days).
    pub refresh_token_lifetime: i64,

    /// ID token lifetime (default 60 minutes).
    pub id_token_lifetime: i64,

    /// Authorization code lifetime (default 10 minutes).
    pub auth_code_lifetime: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8000".to_string(),
            site_domain: "seat.local".to_string(),
            access_token_lifetime: 60,
            refresh_token_lifetime: 10_080,
            id_token_lifetime: 60,
            auth_code_lifetime: 10,
        }
    }
}

/// Token endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The signed access token.
    pub access_token: String,

    /// Always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Refresh token, if issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token, issued when the `openid` scope was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scopes, space-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Mints, signs, and records tokens.
pub struct TokenIssuer {
    config: TokenConfig,
    keys: Arc<KeyManager>,
    store: Arc<dyn TokenStore>,
}

impl TokenIssuer {
    /// Creates a token issuer.
    pub fn new(config: TokenConfig, keys: Arc<KeyManager>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            config,
            keys,
            store,
        }
    }

    /// Returns the issuance configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issues and records a single-use authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    pub async fn issue_code(
        &self,
        client_id: &str,
        user_id: i64,
        scopes: Vec<Scope>,
        redirect_uri: String,
        code_challenge: Option<String>,
        code_challenge_method: Option<CodeChallengeMethod>,
    ) -> OidcResult<AuthorizationCode> {
        let code = AuthorizationCode {
            id: idp_crypto::generate_token_id(),
            client_id: client_id.to_string(),
            user_id,
            scopes,
            redirect_uri,
            code_challenge,
            code_challenge_method,
            revoked: false,
            expires_at: Utc::now() + Duration::minutes(self.config.auth_code_lifetime),
        };

        self.store.insert_code(code.clone()).await?;
        Ok(code)
    }

    /// Issues an access token: persists the record, then signs the JWT with
    /// the active key, carrying its `kid` in the header.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence or signing fails.
    pub async fn issue_access_token(
        &self,
        client_id: &str,
        user_id: i64,
        scopes: Vec<Scope>,
    ) -> OidcResult<(AccessToken, String)> {
        let now = Utc::now();
        let token = AccessToken {
            id: idp_crypto::generate_token_id(),
            client_id: client_id.to_string(),
            user_id,
            scopes,
            revoked: false,
            expires_at: now + Duration::minutes(self.config.access_token_lifetime),
        };

        self.store.insert_access_token(token.clone()).await?;

        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(self.config.issuer));
        claims.insert("sub".to_string(), json!(user_id.to_string()));
        claims.insert("aud".to_string(), json!(client_id));
        claims.insert("jti".to_string(), json!(token.id));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("nbf".to_string(), json!(now.timestamp()));
        claims.insert("exp".to_string(), json!(token.expires_at.timestamp()));
        claims.insert(
            "scopes".to_string(),
            json!(token.scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
        );

        let keypair = self.keys.active_keypair().await?;
        let jwt = sign_claims(&keypair, &claims)?;

        Ok((token, jwt))
    }

    /// Issues a refresh token chained to an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    pub async fn issue_refresh_token(&self, access: &AccessToken) -> OidcResult<RefreshToken> {
        let token = RefreshToken {
            id: idp_crypto::generate_token_id(),
            access_token_id: access.id.clone(),
            client_id: access.client_id.clone(),
            user_id: access.user_id,
            revoked: false,
            expires_at: Utc::now() + Duration::minutes(self.config.refresh_token_lifetime),
        };

        self.store.insert_refresh_token(token.clone()).await?;
        Ok(token)
    }

    /// Builds and signs an ID token: registered claims merged over the
    /// scope-filtered identity claims.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub async fn issue_id_token(
        &self,
        client_id: &str,
        user: &DirectoryUser,
        scopes: &[Scope],
    ) -> OidcResult<String> {
        let now = Utc::now();
        let mut claims = IdentityClaims::for_user(user, &self.config.site_domain).filter(scopes);

        claims.insert("iss".to_string(), json!(self.config.issuer));
        claims.insert("aud".to_string(), json!(client_id));
        claims.insert("sub".to_string(), json!(user.id.to_string()));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("nbf".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::minutes(self.config.id_token_lifetime)).timestamp()),
        );
        claims.insert("jti".to_string(), json!(idp_crypto::generate_token_id()));

        let keypair = self.keys.active_keypair().await?;
        sign_claims(&keypair, &claims)
    }

    /// Issues the full token set for a grant: access token, refresh token,
    /// and — when `openid` was granted — an ID token.
    ///
    /// # Errors
    ///
    /// Returns an error if any issuance step fails.
    pub async fn issue_token_set(
        &self,
        client_id: &str,
        user: &DirectoryUser,
        scopes: Vec<Scope>,
    ) -> OidcResult<TokenResponse> {
        let (access, jwt) = self
            .issue_access_token(client_id, user.id, scopes.clone())
            .await?;
        let refresh = self.issue_refresh_token(&access).await?;

        let id_token = if scopes.contains(&Scope::OpenId) {
            Some(self.issue_id_token(client_id, user, &scopes).await?)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token: jwt,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_lifetime * 60,
            refresh_token: Some(refresh.id),
            id_token,
            scope: Some(Scope::join(&scopes)),
        })
    }

    /// Logically revokes an access token. Idempotent; chained refresh
    /// tokens become unusable at read time.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn revoke_access_token(&self, id: &str) -> OidcResult<()> {
        self.store.revoke_access_token(id).await?;
        Ok(())
    }

    /// Whether an access token is revoked. Unknown ids read as revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn is_access_token_revoked(&self, id: &str) -> OidcResult<bool> {
        Ok(self.store.is_access_token_revoked(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::UnverifiedJwt;
    use idp_crypto::SignatureAlgorithm;
    use idp_storage::MemoryStore;

    fn issuer_with_store() -> (TokenIssuer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyManager::new(store.clone(), SignatureAlgorithm::Es256));
        (
            TokenIssuer::new(TokenConfig::default(), keys, store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn access_token_jwt_carries_kid_and_scopes() {
        let (issuer, _) = issuer_with_store();
        let (record, jwt) = issuer
            .issue_access_token("client-1", 42, vec![Scope::OpenId, Scope::Profile])
            .await
            .unwrap();

        let parsed = UnverifiedJwt::parse(&jwt).unwrap();
        assert!(parsed.header.kid.is_some());
        assert_eq!(parsed.string_claim("jti").unwrap(), record.id);
        assert_eq!(parsed.string_claim("sub").unwrap(), "42");
        assert_eq!(
            parsed.claims.get("scopes").unwrap(),
            &json!(["openid", "profile"])
        );
    }

    #[tokio::test]
    async fn id_token_only_with_openid_scope() {
        let (issuer, _) = issuer_with_store();
        let user = DirectoryUser::new(7, "pilot");

        let with = issuer
            .issue_token_set("c", &user, vec![Scope::OpenId])
            .await
            .unwrap();
        assert!(with.id_token.is_some());

        let without = issuer
            .issue_token_set("c", &user, vec![Scope::Profile])
            .await
            .unwrap();
        assert!(without.id_token.is_none());
    }

    #[tokio::test]
    async fn id_token_claims_are_scope_filtered() {
        let (issuer, _) = issuer_with_store();
        let mut user = DirectoryUser::new(7, "pilot");
        user.squads = vec!["fleet".to_string()];

        let jwt = issuer
            .issue_id_token("c", &user, &[Scope::OpenId, Scope::Profile])
            .await
            .unwrap();
        let parsed = UnverifiedJwt::parse(&jwt).unwrap();

        assert_eq!(parsed.string_claim("name").unwrap(), "pilot");
        assert_eq!(parsed.string_claim("aud").unwrap(), "c");
        // squads is behind seat:squads, which was not granted.
        assert!(!parsed.claims.contains_key("squads"));
        // Always-on claims are present regardless of scope.
        assert_eq!(parsed.claims.get("is_admin").unwrap(), &json!(false));
    }

    #[tokio::test]
    async fn revocation_is_idempotent_and_fail_closed() {
        let (issuer, _) = issuer_with_store();
        let (record, _) = issuer
            .issue_access_token("c", 1, vec![Scope::OpenId])
            .await
            .unwrap();

        assert!(!issuer.is_access_token_revoked(&record.id).await.unwrap());
        issuer.revoke_access_token(&record.id).await.unwrap();
        issuer.revoke_access_token(&record.id).await.unwrap();
        assert!(issuer.is_access_token_revoked(&record.id).await.unwrap());
        assert!(issuer.is_access_token_revoked("never-issued").await.unwrap());
    }
}
