//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing and the bounded hashing pool.
//! - [`jwt`] -- Access token issuance and verification.

pub mod jwt;
pub mod password;
