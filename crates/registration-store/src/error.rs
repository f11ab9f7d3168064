//! Store error types.

use thiserror::Error;

/// Registration store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization error for a stored registration body
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
