//! # EcoCommute Shared Library
//!
//! Domain types, storage and business rules shared by the EcoCommute API.
//!
//! ## Module Organization
//!
//! - `models`: Row types and PostgreSQL queries
//! - `storage`: The `Storage` trait with in-memory and PostgreSQL backends
//! - `tracking`: Points/CO₂ scoring, weekly merge, challenge reconciliation
//!   and the commute submission flow
//! - `auth`: Passwords, JWTs, identity resolution and authorization checks
//! - `db`: Connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod storage;
pub mod tracking;

/// Current version of the EcoCommute shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
