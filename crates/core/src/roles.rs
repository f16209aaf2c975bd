//! Well-known role name constants.
//!
//! These must match the check constraint in `20260301000001_create_users_table.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Every role an identity may hold.
pub const KNOWN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_USER];

/// Returns `true` if `role` is one of [`KNOWN_ROLES`].
pub fn is_known_role(role: &str) -> bool {
    KNOWN_ROLES.contains(&role)
}
