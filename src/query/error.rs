//! Query error types
//!
//! Validation failures raised while turning a caller-supplied search into a
//! typed query. All of them are detected before the store is touched.

use thiserror::Error;

/// Errors that can occur while validating a data query expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Operator is unknown, or a combinator was used on a comparison (or the reverse)
    #[error("Unsupported operator '{operator}' in expression {expression}")]
    UnsupportedOperator { operator: String, expression: String },

    /// Field path contains characters that cannot be safely placed in a filter
    #[error("Invalid field '{field}' in expression {expression}")]
    InvalidField { field: String, expression: String },

    /// Comparison value has the wrong shape for its operator
    #[error("Invalid value for '{operator}': {reason} in expression {expression}")]
    InvalidValue {
        operator: String,
        reason: String,
        expression: String,
    },
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_expression() {
        let err = QueryError::UnsupportedOperator {
            operator: "!=".to_string(),
            expression: r#"{"field":"amount","operator":"!=","value":1}"#.to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("'!='"));
        assert!(msg.contains(r#""field":"amount""#));
    }
}
