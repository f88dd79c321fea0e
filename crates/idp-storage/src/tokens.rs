//! Issued token and authorization code storage provider.
//!
//! Revocation reads fail closed: asking about an identifier that was never
//! stored reports it as revoked.

use async_trait::async_trait;
use idp_model::{AccessToken, AuthorizationCode, RefreshToken};

use crate::error::StorageResult;

/// Provider for authorization codes, access tokens, and refresh tokens.
///
/// Revocation is logical and idempotent; revoking an already-revoked or
/// unknown identifier is not an error.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persists a new authorization code.
    async fn insert_code(&self, code: AuthorizationCode) -> StorageResult<()>;

    /// Gets an authorization code by id.
    async fn get_code(&self, id: &str) -> StorageResult<Option<AuthorizationCode>>;

    /// Revokes an authorization code.
    async fn revoke_code(&self, id: &str) -> StorageResult<()>;

    /// Whether a code is revoked; unknown ids count as revoked.
    async fn is_code_revoked(&self, id: &str) -> StorageResult<bool>;

    /// Persists a new access token record.
    async fn insert_access_token(&self, token: AccessToken) -> StorageResult<()>;

    /// Gets an access token record by id.
    async fn get_access_token(&self, id: &str) -> StorageResult<Option<AccessToken>>;

    /// Revokes an access token.
    async fn revoke_access_token(&self, id: &str) -> StorageResult<()>;

    /// Whether an access token is revoked; unknown ids count as revoked.
    async fn is_access_token_revoked(&self, id: &str) -> StorageResult<bool>;

    /// Persists a new refresh token record.
    async fn insert_refresh_token(&self, token: RefreshToken) -> StorageResult<()>;

    /// Gets a refresh token record by id.
    async fn get_refresh_token(&self, id: &str) -> StorageResult<Option<RefreshToken>>;

    /// Revokes a refresh token.
    async fn revoke_refresh_token(&self, id: &str) -> StorageResult<()>;

    /// Removes every code and token issued to a client. Used by the client
    /// deletion cascade.
    async fn purge_client(&self, client_id: &str) -> StorageResult<()>;
}
