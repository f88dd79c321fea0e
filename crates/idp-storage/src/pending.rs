//! Pending authorization (consent flow) storage.

use async_trait::async_trait;
use idp_model::PendingAuthorization;

use crate::error::StorageResult;

/// Provider for in-flight authorization requests between the authorize
/// round-trip and the consent decision.
///
/// Entries are keyed by an opaque consent token bound to one browser
/// session; they are single-use and expire when abandoned.
#[async_trait]
pub trait PendingAuthStore: Send + Sync {
    /// Stores a pending authorization under a consent token.
    async fn put_pending(&self, token: &str, pending: PendingAuthorization) -> StorageResult<()>;

    /// Removes and returns a pending authorization. Expired entries are
    /// dropped and reported as absent.
    async fn take_pending(&self, token: &str) -> StorageResult<Option<PendingAuthorization>>;
}
