//! Storage layer error types
//!
//! Every store operation surfaces failures through `StorageError`. The store
//! logs once at the point of failure and hands the error back unchanged.

use thiserror::Error;

use crate::storage::timestamp::TimestampError;

/// Errors that can occur in the record store
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite statement preparation or execution failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not check out a session from the pool
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Payload could not be serialized or a stored payload is not valid JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored timestamp column could not be decoded
    #[error("Corrupt timestamp column: {0}")]
    Timestamp(#[from] TimestampError),

    /// A stored payload is valid JSON but not an object
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// The blocking worker running the statement panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),

    /// I/O operation failed (creating the database directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Task(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
