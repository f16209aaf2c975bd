//! Process-local [`IdentityStore`] for development and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use warden_core::error::AuthError;
use warden_core::identity::{IdentityStore, NewIdentity, StoredIdentity};
use warden_core::types::DbId;

#[derive(Debug, Default)]
struct Inner {
    last_id: DbId,
    rows: BTreeMap<DbId, StoredIdentity>,
}

/// Identities kept in a map behind an async `RwLock`.
///
/// Ids are assigned sequentially from 1. The store can be switched offline or
/// given artificial latency to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`AuthError::IdentityStoreUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before touching the data.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    async fn gate(&self) -> Result<(), AuthError> {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::IdentityStoreUnavailable(
                "identity store offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<StoredIdentity>, AuthError> {
        self.gate().await?;
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .find(|row| row.login_id == login_id)
            .cloned())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<StoredIdentity>, AuthError> {
        self.gate().await?;
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn create(&self, identity: NewIdentity) -> Result<StoredIdentity, AuthError> {
        self.gate().await?;
        let mut inner = self.inner.write().await;
        if inner.rows.values().any(|row| row.login_id == identity.login_id) {
            return Err(AuthError::DuplicateLoginId(identity.login_id));
        }

        inner.last_id += 1;
        let now = Utc::now();
        let row = StoredIdentity {
            id: inner.last_id,
            login_id: identity.login_id,
            role: identity.role,
            password_hash: identity.password_hash,
            display_name: identity.display_name,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_password_hash(&self, id: DbId, password_hash: &str) -> Result<bool, AuthError> {
        self.gate().await?;
        let mut inner = self.inner.write().await;
        match inner.rows.get_mut(&id) {
            Some(row) => {
                row.password_hash = password_hash.to_string();
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_role(&self, id: DbId, role: &str) -> Result<Option<StoredIdentity>, AuthError> {
        self.gate().await?;
        let mut inner = self.inner.write().await;
        Ok(inner.rows.get_mut(&id).map(|row| {
            row.role = role.to_string();
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn list(&self) -> Result<Vec<StoredIdentity>, AuthError> {
        self.gate().await?;
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }
}
