//! Host application collaborators.
//!
//! The host application authenticates users and owns the directory; the
//! identity provider reads through these two interfaces and never writes.

use async_trait::async_trait;
use idp_model::DirectoryUser;

use crate::error::StorageResult;

/// Read-only view of the host directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Gets a user by directory id.
    async fn get_user(&self, user_id: i64) -> StorageResult<Option<DirectoryUser>>;

    /// Whether the user exists and is active. Deactivated users fail
    /// refresh-token redemption.
    async fn is_user_active(&self, user_id: i64) -> StorageResult<bool> {
        Ok(self
            .get_user(user_id)
            .await?
            .is_some_and(|user| user.active))
    }
}

/// The host application's browser session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolves the authenticated user for a session token, if any.
    async fn user_for_session(&self, session: &str) -> StorageResult<Option<i64>>;

    /// Ends a session (SAML single logout).
    async fn end_session(&self, session: &str) -> StorageResult<()>;
}
