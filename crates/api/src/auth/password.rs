//! Argon2id password hashing and verification.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself; raising
//! the configured cost therefore never invalidates existing hashes.
//!
//! Hashing is CPU-bound. [`HashingPool`] moves it onto the blocking thread pool
//! and caps how many hashes run at once; callers beyond the cap wait for a
//! permit instead of spawning more work.

use std::fmt;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tokio::sync::Semaphore;
use warden_core::error::AuthError;

use crate::config::{parse_or, ConfigError, EnvSource};

/// Argon2 cost parameters and hashing concurrency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: `19456`, the OWASP baseline).
    pub memory_kib: u32,
    /// Number of passes (default: `2`).
    pub iterations: u32,
    /// Degree of parallelism (default: `1`).
    pub parallelism: u32,
    /// Maximum hashes computed at the same time (default: CPU count).
    pub max_concurrent: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
            max_concurrent: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl PasswordConfig {
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `ARGON2_MEMORY_KIB`     | `19456`     |
    /// | `ARGON2_ITERATIONS`     | `2`         |
    /// | `ARGON2_PARALLELISM`    | `1`         |
    /// | `MAX_CONCURRENT_HASHES` | CPU count   |
    pub fn from_source(env: EnvSource<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            memory_kib: parse_or(env, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(env, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(env, "ARGON2_PARALLELISM", defaults.parallelism)?,
            max_concurrent: parse_or(env, "MAX_CONCURRENT_HASHES", defaults.max_concurrent)?,
        };
        if config.max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_CONCURRENT_HASHES",
                reason: "must be greater than zero".into(),
            });
        }
        config.params()?;
        Ok(config)
    }

    /// Cheapest parameters Argon2 accepts. Only for tests.
    pub fn fast_insecure() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST.max(64),
            iterations: 1,
            parallelism: 1,
            max_concurrent: 4,
        }
    }

    fn params(&self) -> Result<Params, ConfigError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| {
            ConfigError::Invalid {
                name: "ARGON2_MEMORY_KIB",
                reason: format!("invalid Argon2 parameters: {e}"),
            }
        })
    }
}

/// Synchronous Argon2id hasher.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.argon2.params();
        f.debug_struct("PasswordHasher")
            .field("memory_kib", &params.m_cost())
            .field("iterations", &params.t_cost())
            .field("parallelism", &params.p_cost())
            .finish()
    }
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, ConfigError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.params()?);
        Ok(Self { argon2 })
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// Returns the PHC-formatted hash string (includes algorithm, params, salt, and hash).
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        if plaintext.is_empty() {
            return Err(AuthError::InvalidInput);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| AuthError::InvalidInput)?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC-formatted hash.
    ///
    /// The salt and cost parameters come from `stored_hash`. Returns `Ok(true)`
    /// if the password matches, `Ok(false)` if it does not.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::MalformedHash)?;
        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::MalformedHash),
        }
    }
}

/// Bounded async front-end for [`PasswordHasher`].
#[derive(Clone)]
pub struct HashingPool {
    hasher: Arc<PasswordHasher>,
    permits: Arc<Semaphore>,
}

impl HashingPool {
    pub fn new(hasher: PasswordHasher, max_concurrent: usize) -> Self {
        Self {
            hasher: Arc::new(hasher),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub async fn hash(&self, plaintext: String) -> Result<String, AuthError> {
        self.run(move |hasher| hasher.hash(&plaintext)).await
    }

    pub async fn verify(&self, plaintext: String, stored_hash: String) -> Result<bool, AuthError> {
        self.run(move |hasher| hasher.verify(&plaintext, &stored_hash))
            .await
    }

    /// Run `job` on the blocking pool once a permit is available.
    ///
    /// The permit moves into the blocking task, so it is released when the
    /// hash finishes even if the awaiting caller has gone away.
    async fn run<T, F>(&self, job: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(&PasswordHasher) -> Result<T, AuthError> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| AuthError::HashingFailed(e.to_string()))?;
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(&hasher)
        })
        .await
        .map_err(|e| AuthError::HashingFailed(format!("hashing task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig::fast_insecure()).expect("valid params")
    }

    #[test]
    fn test_hash_and_verify() {
        let password = "correct-horse-battery-staple";
        let hash = hasher().hash(password).expect("hashing should succeed");

        // The hash must be a valid PHC string starting with the argon2id identifier.
        assert!(
            hash.starts_with("$argon2id$"),
            "expected argon2id PHC prefix"
        );
        assert!(!hash.contains(password));

        let verified = hasher().verify(password, &hash).expect("verify should succeed");
        assert!(verified, "correct password should verify as true");
    }

    #[test]
    fn test_wrong_password_fails() {
        let hash = hasher().hash("real-password").expect("hashing should succeed");
        let verified = hasher()
            .verify("wrong-password", &hash)
            .expect("verify should succeed");
        assert!(!verified, "wrong password should verify as false");
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let h = hasher();
        let first = h.hash("same-password").unwrap();
        let second = h.hash("same-password").unwrap();

        assert_ne!(first, second, "salts must differ between hashes");
        assert!(h.verify("same-password", &first).unwrap());
        assert!(h.verify("same-password", &second).unwrap());
    }

    #[test]
    fn test_empty_password_is_invalid_input() {
        assert_matches!(hasher().hash(""), Err(AuthError::InvalidInput));
    }

    #[test]
    fn test_malformed_hash_is_reported() {
        assert_matches!(
            hasher().verify("anything", "not-a-phc-string"),
            Err(AuthError::MalformedHash)
        );
    }

    #[test]
    fn test_hash_from_other_cost_still_verifies() {
        let cheap = hasher();
        let hash = cheap.hash("portable-password").unwrap();

        let pricier = PasswordHasher::new(&PasswordConfig {
            iterations: 2,
            ..PasswordConfig::fast_insecure()
        })
        .unwrap();
        assert!(pricier.verify("portable-password", &hash).unwrap());
    }

    #[test]
    fn test_debug_shows_cost_params() {
        let printed = format!("{:?}", hasher());
        assert!(printed.starts_with("PasswordHasher"));
        assert!(printed.contains("iterations: 1"));
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let config = PasswordConfig {
            memory_kib: 1,
            ..PasswordConfig::fast_insecure()
        };
        assert_matches!(
            PasswordHasher::new(&config),
            Err(ConfigError::Invalid { .. })
        );
    }

    #[tokio::test]
    async fn test_pool_hashes_and_verifies() {
        let pool = HashingPool::new(hasher(), 1);
        let hash = pool.hash("pooled-password".into()).await.unwrap();

        assert!(pool
            .verify("pooled-password".into(), hash.clone())
            .await
            .unwrap());
        assert!(!pool.verify("other".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_pool_queues_beyond_capacity() {
        let pool = HashingPool::new(hasher(), 2);
        let jobs: Vec<_> = (0..6)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.hash(format!("password-{i}")).await })
            })
            .collect();

        for job in jobs {
            assert!(job.await.unwrap().is_ok());
        }
        assert_eq!(pool.permits.available_permits(), 2);
    }
}
