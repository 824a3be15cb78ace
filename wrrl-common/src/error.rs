//! Common error types for WRRL

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for WRRL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for ledger domain operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Infrastructure errors shared across WRRL services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Domain rejection returned by ledger commands.
///
/// Every command either fully applies or fails with one of these and leaves
/// ledger state untouched. Rejections are ordinary values: they are recorded
/// in the journal outcome column and mapped onto HTTP statuses by the API
/// layer, and they recur identically on replay.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum LedgerError {
    /// Caller lacks the role or capability the operation requires
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create would collide with an existing record
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Malformed or out-of-range input, including conservation violations
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation is not valid in the record's current lifecycle state
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Usage verification did not pass for the referenced key
    #[error("External verification failed: {0}")]
    ExternalVerification(String),
}

impl LedgerError {
    /// Variant tag, matching the serialized `kind` field
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Authorization(_) => "Authorization",
            LedgerError::NotFound(_) => "NotFound",
            LedgerError::AlreadyExists(_) => "AlreadyExists",
            LedgerError::InvalidParameter(_) => "InvalidParameter",
            LedgerError::StateConflict(_) => "StateConflict",
            LedgerError::ExternalVerification(_) => "ExternalVerification",
        }
    }
}
