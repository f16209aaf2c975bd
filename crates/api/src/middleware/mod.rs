//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated principal from a JWT Bearer token.
//! - [`rbac::PolicySet`] -- Authorization policy per protected [`rbac::Operation`].
//! - [`rbac::authorize`] -- Runs a policy decision for a handler.

pub mod auth;
pub mod rbac;
