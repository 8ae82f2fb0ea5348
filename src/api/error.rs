//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::query::QueryError;
use crate::records::RecordError;
use crate::storage::StorageError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Data query expression rejected
    #[error("Validation error: {0}")]
    Validation(#[from] QueryError),

    /// A timestamp in the request could not be parsed
    #[error("{0}")]
    InvalidTimestamp(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Service unavailable (database unreachable)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation(e) => ApiError::Validation(e),
            e @ RecordError::Timestamp { .. } => ApiError::InvalidTimestamp(e.to_string()),
            RecordError::Storage(e) => ApiError::Storage(e),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::InvalidTimestamp(_) => (StatusCode::BAD_REQUEST, "INVALID_TIMESTAMP"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // storage failures were already logged where they happened
        if status.is_server_error() && !matches!(self, ApiError::Storage(_)) {
            tracing::error!(error_code = %code, error_message = %self, "API error occurred");
        } else {
            tracing::debug!(error_code = %code, error_message = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TimestampError;

    #[test]
    fn test_record_error_mapping() {
        let err: ApiError = RecordError::Validation(QueryError::UnsupportedOperator {
            operator: "!=".to_string(),
            expression: "{}".to_string(),
        })
        .into();
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));

        let err: ApiError = RecordError::Timestamp {
            field: "eventTimestamp",
            source: TimestampError {
                input: "soon".to_string(),
            },
        }
        .into();
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_TIMESTAMP"));

        let err: ApiError =
            RecordError::Storage(StorageError::Corruption("bad row".to_string())).into();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::ServiceUnavailable("db down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
