//! Stored identity records and the identity store boundary.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::types::{DbId, Timestamp};

/// A persisted identity.
///
/// Contains the password hash -- never serialize this to API responses directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub id: DbId,
    pub login_id: String,
    pub role: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a new identity. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub login_id: String,
    pub role: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

/// Persistence collaborator for identities.
///
/// Implementations must enforce login id uniqueness in [`create`](Self::create)
/// and report it as [`AuthError::DuplicateLoginId`]. Any infrastructure failure
/// is reported as [`AuthError::IdentityStoreUnavailable`]; retrying is left to
/// the implementation or the caller.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<StoredIdentity>, AuthError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<StoredIdentity>, AuthError>;

    async fn create(&self, identity: NewIdentity) -> Result<StoredIdentity, AuthError>;

    /// Replace the password hash. Returns `false` if no identity has `id`.
    async fn update_password_hash(&self, id: DbId, password_hash: &str) -> Result<bool, AuthError>;

    /// Replace the role. Returns `None` if no identity has `id`.
    async fn update_role(&self, id: DbId, role: &str) -> Result<Option<StoredIdentity>, AuthError>;

    /// All identities, oldest first.
    async fn list(&self) -> Result<Vec<StoredIdentity>, AuthError>;
}
