//! Orchestration of identity lookups, credential checks and token issuance.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use warden_core::credentials::{CredentialValidator, Credentials};
use warden_core::error::AuthError;
use warden_core::identity::{IdentityStore, NewIdentity, StoredIdentity};
use warden_core::principal::Principal;
use warden_core::roles::{is_known_role, ROLE_ADMIN};
use warden_core::types::DbId;

use crate::auth::jwt::TokenService;
use crate::auth::password::HashingPool;

/// Password hashed at startup and verified against when a login id is
/// unknown, so both failure paths do the same amount of work.
const TIMING_DECOY_PASSWORD: &str = "warden-timing-decoy-password";

/// Tunables for [`UserService`].
#[derive(Debug, Clone)]
pub struct UserServiceSettings {
    /// Role given to identities created through sign-up.
    pub default_role: String,
    /// Lifetime of issued access tokens.
    pub token_ttl: chrono::Duration,
    /// Upper bound on a single identity store call.
    pub store_timeout: Duration,
}

/// Optional profile fields supplied at sign-up.
#[derive(Debug, Clone, Default)]
pub struct SignUpProfile {
    pub display_name: Option<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub identity: StoredIdentity,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn IdentityStore>,
    hashing: HashingPool,
    tokens: TokenService,
    validator: CredentialValidator,
    settings: UserServiceSettings,
    decoy_hash: Arc<str>,
}

impl UserService {
    /// Build the service. Computes the timing decoy hash synchronously.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hashing: HashingPool,
        tokens: TokenService,
        validator: CredentialValidator,
        settings: UserServiceSettings,
    ) -> Result<Self, AuthError> {
        let decoy_hash = hashing.hasher().hash(TIMING_DECOY_PASSWORD)?;
        Ok(Self {
            store,
            hashing,
            tokens,
            validator,
            settings,
            decoy_hash: decoy_hash.into(),
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Project a stored identity to the claims carried in tokens.
    pub fn to_principal(identity: &StoredIdentity) -> Principal {
        Principal::new(identity.id.to_string(), identity.role.clone())
    }

    /// Prove that `credentials` belong to a stored identity.
    ///
    /// Unknown login ids and wrong passwords are distinct errors here but the
    /// HTTP layer renders them identically.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<StoredIdentity, AuthError> {
        self.validator.validate(credentials)?;

        let found = self
            .bounded(self.store.find_by_login_id(&credentials.login_id))
            .await?;

        let Some(identity) = found else {
            // Burn the same hashing cost as a real verification.
            let _ = self
                .hashing
                .verify(credentials.password.clone(), self.decoy_hash.to_string())
                .await;
            tracing::info!(login_id = %credentials.login_id, "Login failed: unknown login id");
            return Err(AuthError::IdentityNotFound);
        };

        let matches = self
            .hashing
            .verify(credentials.password.clone(), identity.password_hash.clone())
            .await?;
        if !matches {
            tracing::info!(
                login_id = %credentials.login_id,
                user_id = identity.id,
                "Login failed: wrong password"
            );
            return Err(AuthError::InvalidCredentials);
        }

        Ok(identity)
    }

    /// Authenticate and mint an access token.
    ///
    /// The token is only created after verification has completed; dropping
    /// this future earlier produces nothing.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let identity = self.authenticate(credentials).await?;
        let principal = Self::to_principal(&identity);
        let access_token = self.tokens.issue(&principal, self.settings.token_ttl)?;

        tracing::info!(user_id = identity.id, role = %identity.role, "User logged in");
        Ok(LoginOutcome {
            access_token,
            expires_in: self.settings.token_ttl.num_seconds(),
            identity,
        })
    }

    /// Create a new identity with the default role.
    pub async fn sign_up(
        &self,
        credentials: &Credentials,
        profile: SignUpProfile,
    ) -> Result<StoredIdentity, AuthError> {
        let role = self.settings.default_role.clone();
        self.create_identity(credentials, role, profile).await
    }

    /// Create an admin from `credentials` unless the login id already exists.
    ///
    /// Returns `true` if an identity was created.
    pub async fn ensure_admin(&self, credentials: &Credentials) -> Result<bool, AuthError> {
        match self
            .create_identity(credentials, ROLE_ADMIN.to_string(), SignUpProfile::default())
            .await
        {
            Ok(identity) => {
                tracing::info!(user_id = identity.id, login_id = %identity.login_id, "Bootstrap admin created");
                Ok(true)
            }
            Err(AuthError::DuplicateLoginId(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_identity(
        &self,
        credentials: &Credentials,
        role: String,
        profile: SignUpProfile,
    ) -> Result<StoredIdentity, AuthError> {
        self.validator.validate(credentials)?;

        // Fail fast before paying for a hash; `create` still guards against races.
        if self
            .bounded(self.store.find_by_login_id(&credentials.login_id))
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateLoginId(credentials.login_id.clone()));
        }

        let password_hash = self.hashing.hash(credentials.password.clone()).await?;
        let identity = self
            .bounded(self.store.create(NewIdentity {
                login_id: credentials.login_id.clone(),
                role,
                password_hash,
                display_name: profile.display_name,
            }))
            .await?;

        tracing::info!(user_id = identity.id, role = %identity.role, "Identity created");
        Ok(identity)
    }

    /// Change a password after re-verifying the current one.
    pub async fn change_password(
        &self,
        id: DbId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let identity = self.find(id).await?;

        let matches = self
            .hashing
            .verify(current_password.to_string(), identity.password_hash.clone())
            .await?;
        if !matches {
            tracing::info!(user_id = id, "Password change rejected: wrong current password");
            return Err(AuthError::CurrentPasswordMismatch);
        }

        self.validator.validate_password(new_password)?;
        let new_hash = self.hashing.hash(new_password.to_string()).await?;

        if !self
            .bounded(self.store.update_password_hash(id, &new_hash))
            .await?
        {
            return Err(AuthError::IdentityMissing(id));
        }
        tracing::info!(user_id = id, "Password changed");
        Ok(())
    }

    /// Assign a new role. Tokens issued earlier keep their old role claim until they expire.
    pub async fn change_role(&self, id: DbId, role: &str) -> Result<StoredIdentity, AuthError> {
        if !is_known_role(role) {
            return Err(AuthError::UnknownRole(role.to_string()));
        }
        let updated = self
            .bounded(self.store.update_role(id, role))
            .await?
            .ok_or(AuthError::IdentityMissing(id))?;

        tracing::info!(user_id = id, role = %role, "Role changed");
        Ok(updated)
    }

    pub async fn find(&self, id: DbId) -> Result<StoredIdentity, AuthError> {
        self.bounded(self.store.find_by_id(id))
            .await?
            .ok_or(AuthError::IdentityMissing(id))
    }

    pub async fn list(&self) -> Result<Vec<StoredIdentity>, AuthError> {
        self.bounded(self.store.list()).await
    }

    /// Apply the store timeout to a single store call.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.settings.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.settings.store_timeout.as_millis() as u64,
                    "Identity store call timed out"
                );
                Err(AuthError::IdentityStoreUnavailable(
                    "identity store timed out".to_string(),
                ))
            }
        }
    }
}
