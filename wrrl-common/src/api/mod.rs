//! Shared HTTP API functionality
//!
//! Authentication primitives used by the WRRL services. This module
//! contains only pure functions and database operations; the axum
//! middleware wrapping them lives in each service crate.

pub mod auth;

pub use auth::{
    calculate_hash, validate_hash, validate_timestamp, ApiAuthError,
};
#[cfg(feature = "sqlx")]
pub use auth::{initialize_shared_secret, load_shared_secret};
