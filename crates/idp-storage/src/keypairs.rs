//! Signing keypair storage provider.

use async_trait::async_trait;
use idp_model::SigningKeypairRecord;

use crate::error::StorageResult;

/// Provider for OIDC signing keypair rows.
///
/// Implementations must uphold the exclusivity invariant: at most one
/// keypair is active at any time, and activation is atomic — there is never
/// a window in which zero or two keypairs are active.
#[async_trait]
pub trait KeypairStore: Send + Sync {
    /// Inserts a new keypair record.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the key id already exists.
    async fn insert_keypair(&self, record: SigningKeypairRecord) -> StorageResult<()>;

    /// Gets a keypair by key id.
    async fn get_keypair(&self, key_id: &str) -> StorageResult<Option<SigningKeypairRecord>>;

    /// Lists every stored keypair.
    async fn list_keypairs(&self) -> StorageResult<Vec<SigningKeypairRecord>>;

    /// Returns the active, non-expired keypair if one exists.
    async fn find_active_keypair(&self) -> StorageResult<Option<SigningKeypairRecord>>;

    /// Atomically deactivates all keypairs and activates the given one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key id does not exist.
    async fn set_active_keypair(&self, key_id: &str) -> StorageResult<()>;

    /// Deletes an inactive keypair.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key id does not exist and `InvalidState`
    /// if the keypair is currently active.
    async fn delete_keypair(&self, key_id: &str) -> StorageResult<()>;
}
