//! Syntactic validation of submitted login credentials.
//!
//! Runs before any hashing or store lookup so malformed input is rejected
//! cheaply and without revealing whether a lookup would have happened.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::AuthError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default minimum login id length in characters.
pub const DEFAULT_MIN_LOGIN_LENGTH: usize = 3;

/// Default maximum login id length in characters.
pub const DEFAULT_MAX_LOGIN_LENGTH: usize = 64;

/// Default minimum password length in characters.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 12;

/// Upper bound on password size in bytes; keeps hashing cost bounded.
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Login ids start with an alphanumeric and continue with `[A-Za-z0-9._@-]`.
pub const LOGIN_ID_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._@-]*$";

static LOGIN_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOGIN_ID_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Raw login credentials as submitted by a caller. Never persisted.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub login_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tunable limits applied by [`CredentialValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPolicy {
    pub min_login_length: usize,
    pub max_login_length: usize,
    pub min_password_length: usize,
    /// Minimum number of distinct character classes (lowercase, uppercase,
    /// digit, other). `1` effectively disables the diversity check.
    pub min_password_classes: usize,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            min_login_length: DEFAULT_MIN_LOGIN_LENGTH,
            max_login_length: DEFAULT_MAX_LOGIN_LENGTH,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            min_password_classes: 1,
        }
    }
}

/// Pure, synchronous credential format checks.
#[derive(Debug, Clone, Default)]
pub struct CredentialValidator {
    policy: CredentialPolicy,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl CredentialValidator {
    pub fn new(policy: CredentialPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CredentialPolicy {
        &self.policy
    }

    /// Validate both the login id and the password.
    pub fn validate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.validate_login_id(&credentials.login_id)?;
        self.validate_password(&credentials.password)
    }

    pub fn validate_login_id(&self, login_id: &str) -> Result<(), AuthError> {
        let len = login_id.chars().count();
        if len < self.policy.min_login_length {
            return Err(invalid(format!(
                "Login id must be at least {} characters long",
                self.policy.min_login_length
            )));
        }
        if len > self.policy.max_login_length {
            return Err(invalid(format!(
                "Login id must be at most {} characters long",
                self.policy.max_login_length
            )));
        }
        if !LOGIN_ID_RE.is_match(login_id) {
            return Err(invalid(
                "Login id may only contain letters, digits, '.', '_', '@' and '-', \
                 and must start with a letter or digit"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        let min = self.policy.min_password_length;
        if password.chars().count() < min {
            return Err(invalid(format!(
                "Password must be at least {min} characters long"
            )));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(invalid(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} bytes long"
            )));
        }
        let classes = character_classes(password);
        if classes < self.policy.min_password_classes {
            return Err(invalid(format!(
                "Password must mix at least {} of: lowercase, uppercase, digits, symbols",
                self.policy.min_password_classes
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> AuthError {
    AuthError::InvalidCredentialsFormat(msg)
}

/// Count the distinct character classes present in `password`.
fn character_classes(password: &str) -> usize {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut other = false;
    for c in password.chars() {
        if c.is_lowercase() {
            lower = true;
        } else if c.is_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else {
            other = true;
        }
    }
    [lower, upper, digit, other].iter().filter(|&&b| b).count()
}
