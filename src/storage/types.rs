//! Core record types for the storage layer
//!
//! - `TransactionRecord`: one persisted, immutable event row
//! - `TransactionRecordQuery`: search criteria, all present fields AND-ed
//! - `TimestampRange`: optional inclusive bounds on a timestamp column

use chrono::{DateTime, Utc};

use crate::query::DataQueryExpression;

/// Store-assigned sequence number of a transaction record.
///
/// Monotonically increasing and never reused, so it is the authoritative
/// insertion-order signal. `insert_timestamp` is not.
pub type TransactionRecordId = i64;

/// Caller-supplied correlation key. Several records may share one.
pub type UniqueTransactionId = String;

/// Arbitrary JSON object carried by a record
pub type RecordData = serde_json::Map<String, serde_json::Value>;

/// A persisted transaction record
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_record_id: TransactionRecordId,
    pub unique_id: UniqueTransactionId,
    /// Wall-clock time the store persisted the row
    pub insert_timestamp: DateTime<Utc>,
    /// When the business event happened, as reported by the caller
    pub event_timestamp: DateTime<Utc>,
    pub event_type: String,
    pub data: RecordData,
}

impl TransactionRecord {
    /// Get a top-level payload field
    pub fn data_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

/// Inclusive bounds on a timestamp column; either side may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimestampRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Range with only a lower bound
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// Range with only an upper bound
    pub fn until(to: DateTime<Utc>) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }
}

/// Search criteria for transaction records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionRecordQuery {
    /// Substring match on `uniqueId`
    pub unique_id_like: Option<String>,
    /// Acceptable `eventType` values
    pub event_types: Option<Vec<String>>,
    pub event_timestamp: Option<TimestampRange>,
    pub insert_timestamp: Option<TimestampRange>,
    /// Boolean expression over payload fields
    pub data_query_expression: Option<DataQueryExpression>,
}

impl TransactionRecordQuery {
    /// An empty query matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Builder method: substring match on the unique id
    pub fn unique_id_like(mut self, fragment: impl Into<String>) -> Self {
        self.unique_id_like = Some(fragment.into());
        self
    }

    /// Builder method: restrict to a set of event types
    pub fn event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method: bound the event timestamp
    pub fn event_timestamp(mut self, range: TimestampRange) -> Self {
        self.event_timestamp = Some(range);
        self
    }

    /// Builder method: bound the insert timestamp
    pub fn insert_timestamp(mut self, range: TimestampRange) -> Self {
        self.insert_timestamp = Some(range);
        self
    }

    /// Builder method: filter on payload contents
    pub fn data_query(mut self, expression: DataQueryExpression) -> Self {
        self.data_query_expression = Some(expression);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_range_constructors() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(TimestampRange::default(), TimestampRange::new(None, None));
        assert_eq!(TimestampRange::since(t).from, Some(t));
        assert_eq!(TimestampRange::until(t).to, Some(t));
        assert_eq!(TimestampRange::until(t).from, None);
    }

    #[test]
    fn test_query_builder_methods() {
        let query = TransactionRecordQuery::all()
            .unique_id_like("tx-")
            .event_types(["CREATED", "SETTLED"]);

        assert_eq!(query.unique_id_like.as_deref(), Some("tx-"));
        assert_eq!(
            query.event_types,
            Some(vec!["CREATED".to_string(), "SETTLED".to_string()])
        );
        assert!(query.data_query_expression.is_none());
    }
}
