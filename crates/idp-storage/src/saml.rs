//! SAML service provider storage.

use async_trait::async_trait;
use idp_model::SamlServiceProvider;

use crate::error::StorageResult;

/// Provider for SAML service provider registrations.
#[async_trait]
pub trait SamlApplicationStore: Send + Sync {
    /// Inserts a new service provider registration.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the entity id is already registered.
    async fn insert_application(&self, app: SamlServiceProvider) -> StorageResult<()>;

    /// Gets a registration by its local id.
    async fn get_application(&self, id: i64) -> StorageResult<Option<SamlServiceProvider>>;

    /// Gets a registration by the SP's entity id.
    async fn get_application_by_entity_id(
        &self,
        entity_id: &str,
    ) -> StorageResult<Option<SamlServiceProvider>>;

    /// Updates an existing registration in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    async fn update_application(&self, app: SamlServiceProvider) -> StorageResult<()>;

    /// Lists every registration.
    async fn list_applications(&self) -> StorageResult<Vec<SamlServiceProvider>>;

    /// Deletes a registration.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    async fn delete_application(&self, id: i64) -> StorageResult<()>;
}
