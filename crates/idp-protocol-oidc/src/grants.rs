//! Token endpoint grant handling.
//!
//! Supports exactly two grants: `authorization_code` and `refresh_token`.
//! Clients authenticate with their secret via HTTP Basic or form body;
//! the secret is compared as a SHA-256 digest in constant time.

use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

use idp_model::{AuthorizationCode, ClientApplication, CodeChallengeMethod, DirectoryUser};
use idp_storage::{ClientStore, TokenStore, UserDirectory};

use crate::error::{OidcError, OidcResult};
use crate::token::{TokenIssuer, TokenResponse};

/// Grant types this provider accepts.
const ALLOWED_GRANT_TYPES: [&str; 2] = ["authorization_code", "refresh_token"];

/// Form body of a `POST /oauth2/token` request.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`.
    pub grant_type: String,

    /// The authorization code being redeemed.
    pub code: Option<String>,

    /// Redirect URI the code was bound to.
    pub redirect_uri: Option<String>,

    /// The refresh token being redeemed.
    pub refresh_token: Option<String>,

    /// PKCE verifier.
    pub code_verifier: Option<String>,

    /// Client id when using `client_secret_post`.
    pub client_id: Option<String>,

    /// Client secret when using `client_secret_post`.
    pub client_secret: Option<String>,
}

/// Client credentials extracted from a token request.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,

    /// Presented secret.
    pub client_secret: String,
}

impl ClientCredentials {
    /// Extracts credentials from the `Authorization: Basic` header or the
    /// form body (`client_secret_basic` / `client_secret_post`).
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when neither carries a usable pair.
    pub fn extract(authorization: Option<&str>, request: &TokenRequest) -> OidcResult<Self> {
        if let Some(header) = authorization {
            if let Some(encoded) = header.strip_prefix("Basic ") {
                let decoded = STANDARD.decode(encoded.trim()).map_err(|_| {
                    OidcError::InvalidClient("malformed Basic authorization header".to_string())
                })?;
                let decoded = String::from_utf8(decoded).map_err(|_| {
                    OidcError::InvalidClient("malformed Basic authorization header".to_string())
                })?;
                let (client_id, client_secret) = decoded.split_once(':').ok_or_else(|| {
                    OidcError::InvalidClient("malformed Basic authorization header".to_string())
                })?;

                return Ok(Self {
                    client_id: urlencoding::decode(client_id)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| client_id.to_string()),
                    client_secret: urlencoding::decode(client_secret)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| client_secret.to_string()),
                });
            }
        }

        match (&request.client_id, &request.client_secret) {
            (Some(id), Some(secret)) => Ok(Self {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => Err(OidcError::InvalidClient(
                "client authentication required".to_string(),
            )),
        }
    }
}

/// Handles token endpoint requests.
pub struct GrantHandler {
    clients: Arc<dyn ClientStore>,
    tokens: Arc<dyn TokenStore>,
    directory: Arc<dyn UserDirectory>,
    issuer: Arc<TokenIssuer>,
}

impl GrantHandler {
    /// Creates a grant handler.
    pub fn new(
        clients: Arc<dyn ClientStore>,
        tokens: Arc<dyn TokenStore>,
        directory: Arc<dyn UserDirectory>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            clients,
            tokens,
            directory,
            issuer,
        }
    }

    /// Authenticates the client and dispatches the grant.
    ///
    /// # Errors
    ///
    /// Returns a protocol-shaped error for every failure mode.
    pub async fn handle(
        &self,
        credentials: &ClientCredentials,
        request: &TokenRequest,
    ) -> OidcResult<TokenResponse> {
        let client = self.authenticate_client(credentials, &request.grant_type).await?;

        match request.grant_type.as_str() {
            "authorization_code" => self.authorization_code_grant(&client, request).await,
            "refresh_token" => self.refresh_token_grant(&client, request).await,
            other => Err(OidcError::UnsupportedGrantType(other.to_string())),
        }
    }

    /// Validates client id, active flag, secret digest, and grant type.
    async fn authenticate_client(
        &self,
        credentials: &ClientCredentials,
        grant_type: &str,
    ) -> OidcResult<ClientApplication> {
        let client = self
            .clients
            .get_client(&credentials.client_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| OidcError::InvalidClient("client authentication failed".to_string()))?;

        if !client.verify_secret(&credentials.client_secret) {
            tracing::warn!(client = %credentials.client_id, "client secret mismatch");
            return Err(OidcError::InvalidClient(
                "client authentication failed".to_string(),
            ));
        }

        if !ALLOWED_GRANT_TYPES.contains(&grant_type) {
            return Err(OidcError::UnsupportedGrantType(grant_type.to_string()));
        }

        Ok(client)
    }

    /// Redeems an authorization code. Codes are single-use: the code is
    /// revoked before tokens are issued, so a second redemption fails with
    /// `invalid_grant`.
    async fn authorization_code_grant(
        &self,
        client: &ClientApplication,
        request: &TokenRequest,
    ) -> OidcResult<TokenResponse> {
        let code_id = request
            .code
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("code is required".to_string()))?;

        let code = self
            .tokens
            .get_code(code_id)
            .await?
            .ok_or_else(|| OidcError::InvalidGrant("unknown authorization code".to_string()))?;

        if code.client_id != client.client_id {
            return Err(OidcError::InvalidGrant(
                "authorization code was issued to another client".to_string(),
            ));
        }

        if !code.is_usable(Utc::now()) {
            return Err(OidcError::InvalidGrant(
                "authorization code is expired or revoked".to_string(),
            ));
        }

        match request.redirect_uri.as_deref() {
            Some(uri) if uri == code.redirect_uri => {}
            _ => {
                return Err(OidcError::InvalidGrant(
                    "redirect_uri does not match the authorization request".to_string(),
                ));
            }
        }

        verify_pkce(&code, request.code_verifier.as_deref())?;

        // Single use: burn the code before issuing anything.
        self.tokens.revoke_code(code_id).await?;

        let user = self.usable_user(code.user_id).await?;
        self.issuer
            .issue_token_set(&client.client_id, &user, code.scopes)
            .await
    }

    /// Redeems a refresh token, rotating it: the presented refresh token
    /// and its chained access token are revoked before the new set is
    /// issued.
    async fn refresh_token_grant(
        &self,
        client: &ClientApplication,
        request: &TokenRequest,
    ) -> OidcResult<TokenResponse> {
        let refresh_id = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("refresh_token is required".to_string()))?;

        let refresh = self
            .tokens
            .get_refresh_token(refresh_id)
            .await?
            .ok_or_else(|| OidcError::InvalidGrant("unknown refresh token".to_string()))?;

        if refresh.client_id != client.client_id {
            return Err(OidcError::InvalidGrant(
                "refresh token was issued to another client".to_string(),
            ));
        }

        if !refresh.is_usable(Utc::now()) {
            return Err(OidcError::InvalidGrant(
                "refresh token is expired or revoked".to_string(),
            ));
        }

        // Revoking the access token implicitly invalidates the refresh
        // token chained to it; the check is read-time composition.
        let access = self
            .tokens
            .get_access_token(&refresh.access_token_id)
            .await?
            .filter(|a| !a.revoked)
            .ok_or_else(|| {
                OidcError::InvalidGrant("associated access token has been revoked".to_string())
            })?;

        let user = self.usable_user(refresh.user_id).await?;

        // Rotate on use.
        self.tokens.revoke_refresh_token(refresh_id).await?;
        self.tokens.revoke_access_token(&access.id).await?;

        self.issuer
            .issue_token_set(&client.client_id, &user, access.scopes)
            .await
    }

    /// Loads a user and rejects the grant if the directory deactivated
    /// them.
    async fn usable_user(&self, user_id: i64) -> OidcResult<DirectoryUser> {
        self.directory
            .get_user(user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| OidcError::InvalidGrant("user is deactivated".to_string()))
    }
}

/// Checks the PKCE verifier against the challenge recorded with the code.
fn verify_pkce(code: &AuthorizationCode, verifier: Option<&str>) -> OidcResult<()> {
    let Some(challenge) = code.code_challenge.as_deref() else {
        return Ok(());
    };

    let verifier = verifier
        .ok_or_else(|| OidcError::InvalidGrant("code_verifier is required".to_string()))?;

    let derived = match code.code_challenge_method.unwrap_or(CodeChallengeMethod::S256) {
        CodeChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(idp_crypto::sha256(verifier.as_bytes())),
        CodeChallengeMethod::Plain => verifier.to_string(),
    };

    if !idp_crypto::constant_time_eq(derived.as_bytes(), challenge.as_bytes()) {
        return Err(OidcError::InvalidGrant(
            "code_verifier does not match the challenge".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_model::Scope;

    fn code_with_challenge(
        challenge: Option<&str>,
        method: Option<CodeChallengeMethod>,
    ) -> AuthorizationCode {
        AuthorizationCode {
            id: "code1".to_string(),
            client_id: "c1".to_string(),
            user_id: 1,
            scopes: vec![Scope::OpenId],
            redirect_uri: "https://rp.example.com/cb".to_string(),
            code_challenge: challenge.map(ToString::to_string),
            code_challenge_method: method,
            revoked: false,
            expires_at: Utc::now() + chrono::Duration::minutes(10),
        }
    }

    #[test]
    fn basic_credentials_extraction() {
        let header = format!("Basic {}", STANDARD.encode("my-client:my-secret"));
        let request = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: None,
            redirect_uri: None,
            refresh_token: None,
            code_verifier: None,
            client_id: None,
            client_secret: None,
        };

        let creds = ClientCredentials::extract(Some(&header), &request).unwrap();
        assert_eq!(creds.client_id, "my-client");
        assert_eq!(creds.client_secret, "my-secret");
    }

    #[test]
    fn post_credentials_extraction() {
        let request = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: None,
            redirect_uri: None,
            refresh_token: None,
            code_verifier: None,
            client_id: Some("c".to_string()),
            client_secret: Some("s".to_string()),
        };

        let creds = ClientCredentials::extract(None, &request).unwrap();
        assert_eq!(creds.client_id, "c");
        assert_eq!(creds.client_secret, "s");
    }

    #[test]
    fn missing_credentials_are_invalid_client() {
        let request = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: None,
            redirect_uri: None,
            refresh_token: None,
            code_verifier: None,
            client_id: Some("c".to_string()),
            client_secret: None,
        };

        let err = ClientCredentials::extract(None, &request).unwrap_err();
        assert!(matches!(err, OidcError::InvalidClient(_)));
    }

    #[test]
    fn pkce_s256_roundtrip() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = URL_SAFE_NO_PAD.encode(idp_crypto::sha256(verifier.as_bytes()));
        let code = code_with_challenge(Some(&challenge), Some(CodeChallengeMethod::S256));

        verify_pkce(&code, Some(verifier)).unwrap();
        assert!(verify_pkce(&code, Some("wrong-verifier-wrong-verifier-wrong")).is_err());
        assert!(verify_pkce(&code, None).is_err());
    }

    #[test]
    fn pkce_absent_challenge_skips_check() {
        let code = code_with_challenge(None, None);
        verify_pkce(&code, None).unwrap();
    }
}
