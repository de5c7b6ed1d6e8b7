//! Error types for matanno.

use thiserror::Error;

/// Result type for matanno operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for matanno operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A persisted record is missing a required field or has the wrong shape.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Attempted to merge tokens with differing annotations.
    #[error("Merge conflict: {0}")]
    MergeConflict(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A store operation failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Create a malformed record error.
    pub fn malformed_record(msg: impl Into<String>) -> Self {
        Error::MalformedRecord(msg.into())
    }

    /// Create a merge conflict error.
    pub fn merge_conflict(msg: impl Into<String>) -> Self {
        Error::MergeConflict(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }
}
