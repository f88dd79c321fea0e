//! In-memory storage implementation.
//!
//! Backs the test suites and the default server wiring. All maps are
//! guarded by `parking_lot` locks; the keypair activation swap happens
//! under a single write lock so the exclusivity invariant holds without a
//! transaction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;

use idp_model::{
    AccessToken, AuthorizationCode, ClientApplication, DirectoryUser, PendingAuthorization,
    RefreshToken, SamlServiceProvider, SigningKeypairRecord,
};

use crate::clients::ClientStore;
use crate::directory::{SessionProvider, UserDirectory};
use crate::error::{StorageError, StorageResult};
use crate::keypairs::KeypairStore;
use crate::pending::PendingAuthStore;
use crate::saml::SamlApplicationStore;
use crate::tokens::TokenStore;

/// Abandoned consent-flow entries expire after this long.
const PENDING_TTL_MINUTES: i64 = 10;

/// In-memory implementation of every storage provider trait.
#[derive(Default)]
pub struct MemoryStore {
    keypairs: RwLock<Vec<SigningKeypairRecord>>,
    clients: RwLock<HashMap<String, ClientApplication>>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    access_tokens: RwLock<HashMap<String, AccessToken>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
    saml_apps: RwLock<HashMap<i64, SamlServiceProvider>>,
    next_saml_id: AtomicI64,
    pending: RwLock<HashMap<String, PendingAuthorization>>,
    users: RwLock<HashMap<i64, DirectoryUser>>,
    sessions: RwLock<HashMap<String, i64>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_saml_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Seeds a directory user (test and wiring helper).
    pub fn add_user(&self, user: DirectoryUser) {
        self.users.write().insert(user.id, user);
    }

    /// Seeds an authenticated host session (test and wiring helper).
    pub fn add_session(&self, session: impl Into<String>, user_id: i64) {
        self.sessions.write().insert(session.into(), user_id);
    }

    /// Registers a SAML application, assigning the next local id.
    pub fn add_saml_application(&self, mut app: SamlServiceProvider) -> i64 {
        let id = self.next_saml_id.fetch_add(1, Ordering::SeqCst);
        app.id = id;
        self.saml_apps.write().insert(id, app);
        id
    }
}

#[async_trait]
impl KeypairStore for MemoryStore {
    async fn insert_keypair(&self, record: SigningKeypairRecord) -> StorageResult<()> {
        let mut keypairs = self.keypairs.write();
        if keypairs.iter().any(|k| k.key_id == record.key_id) {
            return Err(StorageError::Duplicate(record.key_id));
        }
        if record.is_active {
            for existing in keypairs.iter_mut() {
                existing.is_active = false;
            }
        }
        keypairs.push(record);
        Ok(())
    }

    async fn get_keypair(&self, key_id: &str) -> StorageResult<Option<SigningKeypairRecord>> {
        Ok(self
            .keypairs
            .read()
            .iter()
            .find(|k| k.key_id == key_id)
            .cloned())
    }

    async fn list_keypairs(&self) -> StorageResult<Vec<SigningKeypairRecord>> {
        Ok(self.keypairs.read().clone())
    }

    async fn find_active_keypair(&self) -> StorageResult<Option<SigningKeypairRecord>> {
        let now = Utc::now();
        Ok(self
            .keypairs
            .read()
            .iter()
            .find(|k| k.is_active && !k.is_expired(now))
            .cloned())
    }

    async fn set_active_keypair(&self, key_id: &str) -> StorageResult<()> {
        let mut keypairs = self.keypairs.write();
        if !keypairs.iter().any(|k| k.key_id == key_id) {
            return Err(StorageError::NotFound(key_id.to_string()));
        }
        for keypair in keypairs.iter_mut() {
            keypair.is_active = keypair.key_id == key_id;
        }
        Ok(())
    }

    async fn delete_keypair(&self, key_id: &str) -> StorageResult<()> {
        let mut keypairs = self.keypairs.write();
        let Some(index) = keypairs.iter().position(|k| k.key_id == key_id) else {
            return Err(StorageError::NotFound(key_id.to_string()));
        };
        if keypairs[index].is_active {
            return Err(StorageError::InvalidState(
                "keypair is active".to_string(),
            ));
        }
        keypairs.remove(index);
        Ok(())
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn insert_client(&self, client: ClientApplication) -> StorageResult<()> {
        let mut clients = self.clients.write();
        if clients.contains_key(&client.client_id) {
            return Err(StorageError::Duplicate(client.client_id));
        }
        clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> StorageResult<Option<ClientApplication>> {
        Ok(self.clients.read().get(client_id).cloned())
    }

    async fn update_client(&self, client: ClientApplication) -> StorageResult<()> {
        let mut clients = self.clients.write();
        if !clients.contains_key(&client.client_id) {
            return Err(StorageError::NotFound(client.client_id));
        }
        clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    async fn list_clients(&self) -> StorageResult<Vec<ClientApplication>> {
        Ok(self.clients.read().values().cloned().collect())
    }

    async fn delete_client(&self, client_id: &str) -> StorageResult<()> {
        if self.clients.write().remove(client_id).is_none() {
            return Err(StorageError::NotFound(client_id.to_string()));
        }
        self.purge_client(client_id).await
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_code(&self, code: AuthorizationCode) -> StorageResult<()> {
        self.codes.write().insert(code.id.clone(), code);
        Ok(())
    }

    async fn get_code(&self, id: &str) -> StorageResult<Option<AuthorizationCode>> {
        Ok(self.codes.read().get(id).cloned())
    }

    async fn revoke_code(&self, id: &str) -> StorageResult<()> {
        if let Some(code) = self.codes.write().get_mut(id) {
            code.revoked = true;
        }
        Ok(())
    }

    async fn is_code_revoked(&self, id: &str) -> StorageResult<bool> {
        Ok(self.codes.read().get(id).is_none_or(|c| c.revoked))
    }

    async fn insert_access_token(&self, token: AccessToken) -> StorageResult<()> {
        self.access_tokens.write().insert(token.id.clone(), token);
        Ok(())
    }

    async fn get_access_token(&self, id: &str) -> StorageResult<Option<AccessToken>> {
        Ok(self.access_tokens.read().get(id).cloned())
    }

    async fn revoke_access_token(&self, id: &str) -> StorageResult<()> {
        if let Some(token) = self.access_tokens.write().get_mut(id) {
            token.revoked = true;
        }
        Ok(())
    }

    async fn is_access_token_revoked(&self, id: &str) -> StorageResult<bool> {
        Ok(self.access_tokens.read().get(id).is_none_or(|t| t.revoked))
    }

    async fn insert_refresh_token(&self, token: RefreshToken) -> StorageResult<()> {
        self.refresh_tokens.write().insert(token.id.clone(), token);
        Ok(())
    }

    async fn get_refresh_token(&self, id: &str) -> StorageResult<Option<RefreshToken>> {
        Ok(self.refresh_tokens.read().get(id).cloned())
    }

    async fn revoke_refresh_token(&self, id: &str) -> StorageResult<()> {
        if let Some(token) = self.refresh_tokens.write().get_mut(id) {
            token.revoked = true;
        }
        Ok(())
    }

    async fn purge_client(&self, client_id: &str) -> StorageResult<()> {
        self.codes.write().retain(|_, c| c.client_id != client_id);
        self.access_tokens
            .write()
            .retain(|_, t| t.client_id != client_id);
        self.refresh_tokens
            .write()
            .retain(|_, t| t.client_id != client_id);
        Ok(())
    }
}

#[async_trait]
impl SamlApplicationStore for MemoryStore {
    async fn insert_application(&self, app: SamlServiceProvider) -> StorageResult<()> {
        let mut apps = self.saml_apps.write();
        if apps.contains_key(&app.id) {
            return Err(StorageError::Duplicate(app.id.to_string()));
        }
        if apps.values().any(|a| a.entity_id == app.entity_id) {
            return Err(StorageError::Duplicate(app.entity_id));
        }
        apps.insert(app.id, app);
        Ok(())
    }

    async fn get_application(&self, id: i64) -> StorageResult<Option<SamlServiceProvider>> {
        Ok(self.saml_apps.read().get(&id).cloned())
    }

    async fn get_application_by_entity_id(
        &self,
        entity_id: &str,
    ) -> StorageResult<Option<SamlServiceProvider>> {
        Ok(self
            .saml_apps
            .read()
            .values()
            .find(|a| a.entity_id == entity_id)
            .cloned())
    }

    async fn update_application(&self, app: SamlServiceProvider) -> StorageResult<()> {
        let mut apps = self.saml_apps.write();
        if !apps.contains_key(&app.id) {
            return Err(StorageError::NotFound(app.id.to_string()));
        }
        apps.insert(app.id, app);
        Ok(())
    }

    async fn list_applications(&self) -> StorageResult<Vec<SamlServiceProvider>> {
        Ok(self.saml_apps.read().values().cloned().collect())
    }

    async fn delete_application(&self, id: i64) -> StorageResult<()> {
        if self.saml_apps.write().remove(&id).is_none() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PendingAuthStore for MemoryStore {
    async fn put_pending(&self, token: &str, pending: PendingAuthorization) -> StorageResult<()> {
        self.pending.write().insert(token.to_string(), pending);
        Ok(())
    }

    async fn take_pending(&self, token: &str) -> StorageResult<Option<PendingAuthorization>> {
        let entry = self.pending.write().remove(token);
        Ok(entry.filter(|p| !p.is_expired(Utc::now(), Duration::minutes(PENDING_TTL_MINUTES))))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, user_id: i64) -> StorageResult<Option<DirectoryUser>> {
        Ok(self.users.read().get(&user_id).cloned())
    }
}

#[async_trait]
impl SessionProvider for MemoryStore {
    async fn user_for_session(&self, session: &str) -> StorageResult<Option<i64>> {
        Ok(self.sessions.read().get(session).copied())
    }

    async fn end_session(&self, session: &str) -> StorageResult<()> {
        self.sessions.write().remove(session);
        Ok(())
    }
}
