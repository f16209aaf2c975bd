use std::fmt::Display;
use std::str::FromStr;

use warden_core::credentials::{CredentialPolicy, Credentials};
use warden_core::roles::{is_known_role, ROLE_USER};

use crate::auth::jwt::JwtConfig;
use crate::auth::password::PasswordConfig;

/// Key/value lookup used to read configuration. Production passes the process
/// environment; tests pass a map.
pub type EnvSource<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Read a required, non-empty variable.
pub(crate) fn required(env: EnvSource<'_>, name: &'static str) -> Result<String, ConfigError> {
    match env(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Read and parse an optional variable, falling back to `default`.
pub(crate) fn parse_or<T>(env: EnvSource<'_>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Server configuration loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Postgres URL. When unset the in-memory identity store is used.
    pub database_url: Option<String>,
    /// Upper bound on a single identity store call, in seconds (default: `5`).
    pub store_timeout_secs: u64,
    /// Token signing configuration.
    pub jwt: JwtConfig,
    /// Argon2 cost parameters and hashing concurrency.
    pub password: PasswordConfig,
    /// Login id and password format rules.
    pub credentials: CredentialPolicy,
    /// Role assigned on sign-up (default: `user`).
    pub default_role: String,
    /// Admin account created at startup if it does not exist yet.
    pub bootstrap_admin: Option<Credentials>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `DATABASE_URL`             | unset (in-memory store)    |
    /// | `STORE_TIMEOUT_SECS`       | `5`                        |
    /// | `MIN_PASSWORD_LENGTH`      | `12`                       |
    /// | `MIN_PASSWORD_CLASSES`     | `1`                        |
    /// | `DEFAULT_ROLE`             | `user`                     |
    /// | `BOOTSTRAP_ADMIN_LOGIN`    | unset                      |
    /// | `BOOTSTRAP_ADMIN_PASSWORD` | unset                      |
    ///
    /// See [`JwtConfig`] and [`PasswordConfig`] for their variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&|key| std::env::var(key).ok())
    }

    pub fn from_source(env: EnvSource<'_>) -> Result<Self, ConfigError> {
        let host = env("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(env, "PORT", 3000)?;

        let cors_origins: Vec<String> = env("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_or(env, "REQUEST_TIMEOUT_SECS", 30)?;
        let database_url = env("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let store_timeout_secs: u64 = parse_or(env, "STORE_TIMEOUT_SECS", 5)?;
        if store_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "STORE_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let defaults = CredentialPolicy::default();
        let credentials = CredentialPolicy {
            min_password_length: parse_or(env, "MIN_PASSWORD_LENGTH", defaults.min_password_length)?,
            min_password_classes: parse_or(
                env,
                "MIN_PASSWORD_CLASSES",
                defaults.min_password_classes,
            )?,
            ..defaults
        };
        if credentials.min_password_classes > 4 {
            return Err(ConfigError::Invalid {
                name: "MIN_PASSWORD_CLASSES",
                reason: "at most 4 character classes exist".into(),
            });
        }

        let default_role = env("DEFAULT_ROLE").unwrap_or_else(|| ROLE_USER.into());
        if !is_known_role(&default_role) {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_ROLE",
                reason: format!("unknown role '{default_role}'"),
            });
        }

        let bootstrap_admin = match (env("BOOTSTRAP_ADMIN_LOGIN"), env("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(login), Some(password)) => Some(Credentials::new(login, password)),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "BOOTSTRAP_ADMIN_LOGIN",
                    reason: "BOOTSTRAP_ADMIN_LOGIN and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                        .into(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            store_timeout_secs,
            jwt: JwtConfig::from_source(env)?,
            password: PasswordConfig::from_source(env)?,
            credentials,
            default_role,
            bootstrap_admin,
        })
    }
}
