//! Signing key lifecycle.
//!
//! [`KeyManager`] owns the set of OIDC signing keypairs: it resolves (and
//! lazily creates) the active key, performs the exclusive activation swap,
//! refuses deletion of the active key, and exports the published key set.
//!
//! The active key is cached behind an async mutex that is held across the
//! rotation write, so a reader can never observe a stale active key after a
//! rotation commits.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use idp_crypto::{CryptoError, SignatureAlgorithm, SigningKeypair};
use idp_model::SigningKeypairRecord;
use idp_storage::{KeypairStore, StorageError};

use crate::jwks::{JsonWebKey, JsonWebKeySet};

/// Errors from key lifecycle operations.
///
/// Storage errors keep their shape so callers can distinguish `NotFound`
/// (activating an unknown key) from `InvalidState` (deleting the active
/// key).
#[derive(Debug, Error)]
pub enum KeyringError {
    /// The underlying store rejected the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Key material could not be generated or loaded.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Manages the OIDC signing keypair set.
pub struct KeyManager {
    store: Arc<dyn KeypairStore>,
    default_algorithm: SignatureAlgorithm,
    active: Mutex<Option<Arc<SigningKeypair>>>,
}

impl KeyManager {
    /// Creates a key manager over a keypair store.
    pub fn new(store: Arc<dyn KeypairStore>, default_algorithm: SignatureAlgorithm) -> Self {
        Self {
            store,
            default_algorithm,
            active: Mutex::new(None),
        }
    }

    /// Returns the current active keypair, generating one with the default
    /// algorithm if none exists.
    ///
    /// The result is cached until the next activation or deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if storage or key loading fails.
    pub async fn active_keypair(&self) -> Result<Arc<SigningKeypair>, KeyringError> {
        let mut cached = self.active.lock().await;

        if let Some(keypair) = cached.as_ref() {
            return Ok(Arc::clone(keypair));
        }

        let record = match self.store.find_active_keypair().await? {
            Some(record) => record,
            None => {
                tracing::info!(
                    algorithm = %self.default_algorithm,
                    "no active signing keypair, generating one"
                );
                let keypair = SigningKeypair::generate(self.default_algorithm)?;
                let record = SigningKeypairRecord::from_keypair(&keypair, true);
                self.store.insert_keypair(record.clone()).await?;
                record
            }
        };

        let keypair = Arc::new(record.load()?);
        *cached = Some(Arc::clone(&keypair));
        Ok(keypair)
    }

    /// Generates a new keypair for the given algorithm, persisted inactive.
    ///
    /// Administrators activate it separately; nothing signs with it until
    /// then.
    ///
    /// # Errors
    ///
    /// Returns an error if generation or persistence fails.
    pub async fn generate(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<SigningKeypairRecord, KeyringError> {
        let keypair = SigningKeypair::generate(algorithm)?;
        let record = SigningKeypairRecord::from_keypair(&keypair, false);
        self.store.insert_keypair(record.clone()).await?;
        tracing::info!(kid = %record.key_id, algorithm = %algorithm, "generated signing keypair");
        Ok(record)
    }

    /// Activates a keypair, deactivating all others atomically.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key id does not exist.
    pub async fn activate(&self, key_id: &str) -> Result<(), KeyringError> {
        // Hold the cache lock across the store write: the swap and the
        // invalidation are one critical section.
        let mut cached = self.active.lock().await;
        self.store.set_active_keypair(key_id).await?;
        *cached = None;
        tracing::info!(kid = %key_id, "activated signing keypair");
        Ok(())
    }

    /// Deletes an inactive keypair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the keypair is active, `NotFound` if it
    /// does not exist.
    pub async fn delete(&self, key_id: &str) -> Result<(), KeyringError> {
        let mut cached = self.active.lock().await;
        self.store.delete_keypair(key_id).await?;
        // The store refuses to delete the active key, but drop the cache
        // anyway so a concurrent activation cannot leave it stale.
        *cached = None;
        tracing::info!(kid = %key_id, "deleted signing keypair");
        Ok(())
    }

    /// Looks up a keypair record by key id for verification.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn verification_key(
        &self,
        key_id: &str,
    ) -> Result<Option<SigningKeypairRecord>, KeyringError> {
        Ok(self.store.get_keypair(key_id).await?)
    }

    /// Exports every non-expired keypair as the published JWKS.
    ///
    /// Inactive keys stay published so tokens signed before a rotation
    /// remain verifiable against their original `kid`; deleted keys drop
    /// out.
    ///
    /// # Errors
    ///
    /// Returns an error if storage or key loading fails.
    pub async fn jwks(&self) -> Result<JsonWebKeySet, KeyringError> {
        let now = chrono::Utc::now();
        let mut keys = Vec::new();

        for record in self.store.list_keypairs().await? {
            if record.is_expired(now) {
                continue;
            }
            keys.push(JsonWebKey::from_keypair(&record.load()?)?);
        }

        Ok(JsonWebKeySet { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_storage::MemoryStore;

    fn manager() -> KeyManager {
        KeyManager::new(Arc::new(MemoryStore::new()), SignatureAlgorithm::Es256)
    }

    #[tokio::test]
    async fn active_keypair_is_generated_lazily() {
        let manager = manager();
        let keypair = manager.active_keypair().await.unwrap();
        assert_eq!(keypair.algorithm(), SignatureAlgorithm::Es256);

        // Second call returns the cached key.
        let again = manager.active_keypair().await.unwrap();
        assert_eq!(again.key_id(), keypair.key_id());
    }

    #[tokio::test]
    async fn activation_invalidates_cache() {
        let manager = manager();
        let first = manager.active_keypair().await.unwrap();

        let second = manager.generate(SignatureAlgorithm::Es384).await.unwrap();
        manager.activate(&second.key_id).await.unwrap();

        let active = manager.active_keypair().await.unwrap();
        assert_eq!(active.key_id(), second.key_id);
        assert_ne!(active.key_id(), first.key_id());
        assert_eq!(active.algorithm(), SignatureAlgorithm::Es384);
    }

    #[tokio::test]
    async fn activating_unknown_key_is_not_found() {
        let manager = manager();
        let err = manager.activate("missing").await.unwrap_err();
        assert!(matches!(
            err,
            KeyringError::Storage(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_active_key_is_invalid_state() {
        let manager = manager();
        let active = manager.active_keypair().await.unwrap();

        let err = manager.delete(active.key_id()).await.unwrap_err();
        assert!(matches!(
            err,
            KeyringError::Storage(StorageError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn deleted_key_leaves_the_jwks() {
        let manager = manager();
        let _active = manager.active_keypair().await.unwrap();
        let extra = manager.generate(SignatureAlgorithm::Rs256).await.unwrap();

        assert_eq!(manager.jwks().await.unwrap().keys.len(), 2);

        manager.delete(&extra.key_id).await.unwrap();
        let jwks = manager.jwks().await.unwrap();
        assert_eq!(jwks.keys.len(), 1);
        assert!(jwks.find_key(&extra.key_id).is_none());
    }
}
