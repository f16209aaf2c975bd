use std::sync::Arc;
use std::time::Duration;

use warden_core::clock::Clock;
use warden_core::credentials::CredentialValidator;
use warden_core::error::AuthError;
use warden_core::identity::IdentityStore;

use crate::auth::jwt::TokenService;
use crate::auth::password::{HashingPool, PasswordHasher};
use crate::config::{ConfigError, ServerConfig};
use crate::middleware::rbac::{default_policies, PolicySet};
use crate::services::{UserService, UserServiceSettings};

/// Failures while assembling [`AppState`].
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Identity orchestration (login, sign-up, password and role changes).
    pub users: UserService,
    /// Authorization policies per protected operation.
    pub policies: Arc<PolicySet>,
    /// Database pool, when identities live in Postgres. Used by `/health`.
    pub pool: Option<warden_db::DbPool>,
}

impl AppState {
    /// Wire the services from configuration and an identity store.
    pub fn build(
        config: ServerConfig,
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        pool: Option<warden_db::DbPool>,
    ) -> Result<Self, StartupError> {
        let hasher = PasswordHasher::new(&config.password)?;
        let hashing = HashingPool::new(hasher, config.password.max_concurrent);
        let tokens = TokenService::new(&config.jwt, clock);

        let users = UserService::new(
            store,
            hashing,
            tokens,
            CredentialValidator::new(config.credentials.clone()),
            UserServiceSettings {
                default_role: config.default_role.clone(),
                token_ttl: config.jwt.access_token_ttl(),
                store_timeout: Duration::from_secs(config.store_timeout_secs),
            },
        )?;

        Ok(Self {
            config: Arc::new(config),
            users,
            policies: Arc::new(default_policies()),
            pool,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        self.users.tokens()
    }
}
