//! Stateless JWT access tokens.
//!
//! Access tokens are HMAC-signed JWTs (HS256 unless configured otherwise)
//! containing a [`Claims`] payload. There is no server-side token state: a
//! token is valid until its `exp` passes and cannot be revoked earlier.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use warden_core::clock::Clock;
use warden_core::error::AuthError;
use warden_core::principal::Principal;

use crate::config::{parse_or, required, ConfigError, EnvSource};

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject -- the user's id, as a string.
    pub sub: String,
    /// The user's role name (e.g. `"admin"`, `"user"`).
    pub role: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// Configuration for JWT token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret used to sign and verify tokens.
    pub secret: String,
    /// HMAC algorithm (HS256, HS384 or HS512).
    pub algorithm: Algorithm,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;

/// Longest accepted access token expiry: one year.
pub const MAX_ACCESS_EXPIRY_MINS: i64 = 60 * 24 * 365;

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expiry_mins", &self.access_token_expiry_mins)
            .finish()
    }
}

impl JwtConfig {
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `JWT_ALGORITHM`          | no       | `HS256` |
    /// | `JWT_ACCESS_EXPIRY_MINS` | no       | `15`    |
    pub fn from_source(env: EnvSource<'_>) -> Result<Self, ConfigError> {
        let secret = required(env, "JWT_SECRET")?;

        let algorithm = match env("JWT_ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
                name: "JWT_ALGORITHM",
                reason: e.to_string(),
            })?,
            None => Algorithm::HS256,
        };
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::Invalid {
                name: "JWT_ALGORITHM",
                reason: "only HS256, HS384 and HS512 are supported".into(),
            });
        }

        let access_token_expiry_mins: i64 =
            parse_or(env, "JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS)?;
        if !(1..=MAX_ACCESS_EXPIRY_MINS).contains(&access_token_expiry_mins) {
            return Err(ConfigError::Invalid {
                name: "JWT_ACCESS_EXPIRY_MINS",
                reason: format!("must be between 1 and {MAX_ACCESS_EXPIRY_MINS}"),
            });
        }

        Ok(Self {
            secret,
            algorithm,
            access_token_expiry_mins,
        })
    }

    /// Token lifetime, clamped to `1..=MAX_ACCESS_EXPIRY_MINS` minutes.
    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins.clamp(1, MAX_ACCESS_EXPIRY_MINS))
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies access tokens.
///
/// The signing key is fixed at construction and shared read-only, so a single
/// service can be cloned into every request handler.
#[derive(Clone)]
pub struct TokenService {
    keys: Option<Arc<Keys>>,
    algorithm: Algorithm,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// An empty secret leaves the service without a key; every call then fails
    /// with [`AuthError::Signing`].
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let keys = (!config.secret.is_empty()).then(|| {
            Arc::new(Keys {
                encoding: EncodingKey::from_secret(config.secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            })
        });
        Self {
            keys,
            algorithm: config.algorithm,
            clock,
        }
    }

    fn keys(&self) -> Result<&Keys, AuthError> {
        self.keys
            .as_deref()
            .ok_or_else(|| AuthError::Signing("no signing key configured".into()))
    }

    /// Sign a token for `principal` valid for `ttl` from now.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, AuthError> {
        if ttl <= Duration::zero() {
            return Err(AuthError::Signing("token lifetime must be positive".into()));
        }
        let keys = self.keys()?;

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Signing("token lifetime out of range".into()))?;
        let claims = Claims {
            sub: principal.subject_id.clone(),
            role: principal.role.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &keys.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token and recover the [`Principal`] it carries.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.decode_claims(token)?;
        Ok(Principal::new(claims.sub, claims.role))
    }

    /// Verify a token and return its full claims.
    ///
    /// Checks structure, then signature, then expiry against the injected clock.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let keys = self.keys()?;

        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below against the injected clock, without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &keys.decoding, &validation)
            .map_err(classify)?
            .claims;

        if self.clock.now().timestamp() > claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::MalformedToken,
    }
}
