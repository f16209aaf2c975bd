//! Domain core for the Warden identity service.
//!
//! Everything in this crate is free of HTTP and database concerns: shared
//! types, the error taxonomy, credential validation, the authorization
//! engine, and the identity store boundary trait.

pub mod authz;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod principal;
pub mod roles;
pub mod types;
