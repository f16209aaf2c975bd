//! User entity model.

use sqlx::FromRow;
use warden_core::identity::StoredIdentity;
use warden_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub login_id: String,
    pub role: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<User> for StoredIdentity {
    fn from(row: User) -> Self {
        StoredIdentity {
            id: row.id,
            login_id: row.login_id,
            role: row.role,
            password_hash: row.password_hash,
            display_name: row.display_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug)]
pub struct CreateUser {
    pub login_id: String,
    pub role: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}
