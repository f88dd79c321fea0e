//! OAuth2 client application storage provider.

use async_trait::async_trait;
use idp_model::ClientApplication;

use crate::error::StorageResult;

/// Provider for OAuth2 client application rows.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Inserts a new client.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the client id already exists.
    async fn insert_client(&self, client: ClientApplication) -> StorageResult<()>;

    /// Gets a client by its client id, active or not.
    async fn get_client(&self, client_id: &str) -> StorageResult<Option<ClientApplication>>;

    /// Updates an existing client in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the client does not exist.
    async fn update_client(&self, client: ClientApplication) -> StorageResult<()>;

    /// Lists every registered client.
    async fn list_clients(&self) -> StorageResult<Vec<ClientApplication>>;

    /// Deletes a client. The deletion cascades: every authorization code,
    /// access token, and refresh token issued to the client is removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the client does not exist.
    async fn delete_client(&self, client_id: &str) -> StorageResult<()>;
}
