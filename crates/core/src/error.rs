use crate::types::DbId;

/// Client-visible message for both unknown login ids and wrong passwords.
pub const AUTHENTICATION_FAILED: &str = "Invalid login or password";

/// Client-visible message for every token that fails verification.
pub const INVALID_TOKEN: &str = "Invalid or expired token";

/// Client-visible message for every authorization denial.
pub const FORBIDDEN: &str = "Forbidden";

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures raised by the identity and access-control components.
///
/// The variants are deliberately fine-grained so that logs and tests can tell
/// them apart. They are collapsed into a handful of client-visible classes by
/// the [`From<AuthError> for CoreError`](CoreError) conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Empty or otherwise unhashable plaintext.
    #[error("Password input is invalid")]
    InvalidInput,

    #[error("Stored password hash is malformed")]
    MalformedHash,

    /// The hashing worker could not run the job (pool closed or task panicked).
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("{0}")]
    InvalidCredentialsFormat(String),

    #[error("No identity exists for the given login id")]
    IdentityNotFound,

    #[error("Password does not match")]
    InvalidCredentials,

    /// Re-verification of the current password failed for an authenticated caller.
    #[error("Current password is incorrect")]
    CurrentPasswordMismatch,

    #[error("Identity store unavailable: {0}")]
    IdentityStoreUnavailable(String),

    /// A target identity referenced by id does not exist.
    #[error("Identity {0} not found")]
    IdentityMissing(DbId),

    #[error("Login id '{0}' is already taken")]
    DuplicateLoginId(String),

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Role is not allowed for this operation")]
    RoleNotAllowed,

    #[error("Denied by voter '{0}'")]
    VoterDenied(&'static str),
}

impl AuthError {
    /// Returns `true` for the token verification failures.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedToken | AuthError::InvalidSignature | AuthError::TokenExpired
        )
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::IdentityNotFound | AuthError::InvalidCredentials => {
                CoreError::Unauthorized(AUTHENTICATION_FAILED.to_string())
            }
            AuthError::MalformedToken | AuthError::InvalidSignature | AuthError::TokenExpired => {
                CoreError::Unauthorized(INVALID_TOKEN.to_string())
            }
            AuthError::RoleNotAllowed | AuthError::VoterDenied(_) => {
                CoreError::Forbidden(FORBIDDEN.to_string())
            }
            AuthError::DuplicateLoginId(login_id) => {
                CoreError::Conflict(format!("Login id '{login_id}' is already taken"))
            }
            AuthError::InvalidCredentialsFormat(msg) => CoreError::Validation(msg),
            err @ AuthError::CurrentPasswordMismatch => CoreError::Validation(err.to_string()),
            AuthError::InvalidInput => {
                CoreError::Validation("Password must not be empty".to_string())
            }
            AuthError::UnknownRole(role) => CoreError::Validation(format!("Unknown role '{role}'")),
            AuthError::IdentityMissing(id) => CoreError::NotFound { entity: "User", id },
            AuthError::IdentityStoreUnavailable(msg) => CoreError::Unavailable(msg),
            err @ (AuthError::MalformedHash
            | AuthError::HashingFailed(_)
            | AuthError::Signing(_)) => CoreError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn authentication_failures_collapse_to_one_message() {
        let not_found = CoreError::from(AuthError::IdentityNotFound);
        let wrong_password = CoreError::from(AuthError::InvalidCredentials);

        assert_matches!(&not_found, CoreError::Unauthorized(msg) if msg == AUTHENTICATION_FAILED);
        assert_eq!(not_found.to_string(), wrong_password.to_string());
    }

    #[test]
    fn token_failures_collapse_to_one_message() {
        for err in [
            AuthError::MalformedToken,
            AuthError::InvalidSignature,
            AuthError::TokenExpired,
        ] {
            assert!(err.is_token_error());
            assert_matches!(CoreError::from(err), CoreError::Unauthorized(msg) if msg == INVALID_TOKEN);
        }
    }

    #[test]
    fn authorization_denials_are_forbidden() {
        assert_matches!(CoreError::from(AuthError::RoleNotAllowed), CoreError::Forbidden(_));
        assert_matches!(
            CoreError::from(AuthError::VoterDenied("owner_only")),
            CoreError::Forbidden(msg) if msg == FORBIDDEN
        );
    }

    #[test]
    fn duplicate_login_is_a_distinct_conflict() {
        assert_matches!(
            CoreError::from(AuthError::DuplicateLoginId("alice".into())),
            CoreError::Conflict(msg) if msg.contains("alice")
        );
    }

    #[test]
    fn wrong_current_password_is_validation_not_unauthorized() {
        assert_matches!(
            CoreError::from(AuthError::CurrentPasswordMismatch),
            CoreError::Validation(msg) if msg == "Current password is incorrect"
        );
    }

    #[test]
    fn store_outage_is_unavailable() {
        assert_matches!(
            CoreError::from(AuthError::IdentityStoreUnavailable("timeout".into())),
            CoreError::Unavailable(_)
        );
    }

    #[test]
    fn signing_failure_is_internal() {
        assert_matches!(
            CoreError::from(AuthError::Signing("no key".into())),
            CoreError::Internal(_)
        );
    }
}
