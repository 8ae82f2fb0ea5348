//! Record service error types

use thiserror::Error;

use crate::query::QueryError;
use crate::storage::{StorageError, TimestampError};

/// Errors surfaced by the record service
#[derive(Error, Debug)]
pub enum RecordError {
    /// The data query expression was rejected before reaching the store
    #[error("{0}")]
    Validation(#[from] QueryError),

    /// A caller-supplied timestamp could not be parsed
    #[error("Invalid timestamp for '{field}': {source}")]
    Timestamp {
        field: &'static str,
        #[source]
        source: TimestampError,
    },

    /// The store failed; passed through unchanged
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RecordError {
    pub(crate) fn timestamp(field: &'static str) -> impl FnOnce(TimestampError) -> Self {
        move |source| RecordError::Timestamp { field, source }
    }
}

/// Result type for record service operations
pub type RecordResult<T> = Result<T, RecordError>;
