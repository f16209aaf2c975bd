//! Postgres-backed [`IdentityStore`].

use async_trait::async_trait;
use warden_core::error::AuthError;
use warden_core::identity::{IdentityStore, NewIdentity, StoredIdentity};
use warden_core::types::DbId;

use crate::models::user::CreateUser;
use crate::repositories::UserRepo;
use crate::DbPool;

/// PostgreSQL unique violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Unique constraint guarding login ids.
const LOGIN_ID_CONSTRAINT: &str = "uq_users_login_id";

#[derive(Clone)]
pub struct PgIdentityStore {
    pool: DbPool,
}

impl PgIdentityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<StoredIdentity>, AuthError> {
        let row = UserRepo::find_by_login_id(&self.pool, login_id)
            .await
            .map_err(unavailable)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<StoredIdentity>, AuthError> {
        let row = UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable)?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, identity: NewIdentity) -> Result<StoredIdentity, AuthError> {
        let input = CreateUser {
            login_id: identity.login_id,
            role: identity.role,
            password_hash: identity.password_hash,
            display_name: identity.display_name,
        };
        match UserRepo::create(&self.pool, &input).await {
            Ok(row) => Ok(row.into()),
            Err(err) if is_login_id_conflict(&err) => Err(AuthError::DuplicateLoginId(input.login_id)),
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn update_password_hash(&self, id: DbId, password_hash: &str) -> Result<bool, AuthError> {
        UserRepo::update_password(&self.pool, id, password_hash)
            .await
            .map_err(unavailable)
    }

    async fn update_role(&self, id: DbId, role: &str) -> Result<Option<StoredIdentity>, AuthError> {
        let row = UserRepo::update_role(&self.pool, id, role)
            .await
            .map_err(unavailable)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<StoredIdentity>, AuthError> {
        let rows = UserRepo::list(&self.pool).await.map_err(unavailable)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Returns `true` for a unique violation on the login id constraint.
fn is_login_id_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err.constraint() == Some(LOGIN_ID_CONSTRAINT)
        }
        _ => false,
    }
}

/// Map an infrastructure failure to [`AuthError::IdentityStoreUnavailable`].
///
/// The raw error is logged here; only a generic description leaves the store.
fn unavailable(err: sqlx::Error) -> AuthError {
    tracing::error!(error = %err, "Identity store query failed");
    let kind = match err {
        sqlx::Error::PoolTimedOut => "connection pool timed out",
        sqlx::Error::PoolClosed => "connection pool closed",
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => "database connection failed",
        _ => "database query failed",
    };
    AuthError::IdentityStoreUnavailable(kind.to_string())
}
