//! External record shapes
//!
//! These are the JSON bodies exchanged with callers: camelCase field names,
//! ISO-8601 timestamp strings and an untyped data query expression tree.
//! Conversion into the typed storage and query types happens here, and it is
//! where malformed expressions are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{
    Combinator, Comparison, ComparisonOperator, DataField, DataQueryExpression, QueryError,
    QueryResult,
};
use crate::records::error::{RecordError, RecordResult};
use crate::storage::timestamp;
use crate::storage::{RecordData, TimestampRange, TransactionRecord, TransactionRecordQuery};

/// A transaction record as seen by callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecordDto {
    /// Assigned by the store; ignored on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_record_id: Option<i64>,
    pub unique_id: String,
    /// Assigned by the store; ignored on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_timestamp: Option<String>,
    pub event_timestamp: String,
    pub event_type: String,
    #[serde(default)]
    pub data: RecordData,
}

impl From<TransactionRecord> for TransactionRecordDto {
    fn from(record: TransactionRecord) -> Self {
        Self {
            transaction_record_id: Some(record.transaction_record_id),
            unique_id: record.unique_id,
            insert_timestamp: Some(timestamp::to_iso8601(&record.insert_timestamp)),
            event_timestamp: timestamp::to_iso8601(&record.event_timestamp),
            event_type: record.event_type,
            data: record.data,
        }
    }
}

/// Optional ISO-8601 bounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestampRangeDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl TimestampRangeDto {
    fn to_range(
        &self,
        from_field: &'static str,
        to_field: &'static str,
    ) -> RecordResult<TimestampRange> {
        let from = self
            .from
            .as_deref()
            .map(timestamp::decode)
            .transpose()
            .map_err(RecordError::timestamp(from_field))?;
        let to = self
            .to
            .as_deref()
            .map(timestamp::decode)
            .transpose()
            .map_err(RecordError::timestamp(to_field))?;

        Ok(TimestampRange::new(from, to))
    }
}

/// Search request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecordQueryDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id_like: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_timestamp: Option<TimestampRangeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_timestamp: Option<TimestampRangeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_query_expression: Option<DataQueryExpressionDto>,
}

impl TryFrom<TransactionRecordQueryDto> for TransactionRecordQuery {
    type Error = RecordError;

    fn try_from(dto: TransactionRecordQueryDto) -> RecordResult<Self> {
        let event_timestamp = dto
            .event_timestamp
            .as_ref()
            .map(|r| r.to_range("eventTimestamp.from", "eventTimestamp.to"))
            .transpose()?;
        let insert_timestamp = dto
            .insert_timestamp
            .as_ref()
            .map(|r| r.to_range("insertTimestamp.from", "insertTimestamp.to"))
            .transpose()?;
        let data_query_expression = dto
            .data_query_expression
            .as_ref()
            .map(DataQueryExpression::try_from)
            .transpose()?;

        Ok(TransactionRecordQuery {
            unique_id_like: dto.unique_id_like,
            event_types: dto.event_types,
            event_timestamp,
            insert_timestamp,
            data_query_expression,
        })
    }
}

/// Data query expression as received on the wire.
///
/// ```json
/// {
///   "lhs": { "field": "amount", "operator": ">", "value": 10 },
///   "operator": "AND",
///   "rhs": { "field": "currency", "operator": "=", "value": "EUR" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataQueryExpressionDto {
    Combination {
        lhs: Box<DataQueryExpressionDto>,
        operator: String,
        rhs: Box<DataQueryExpressionDto>,
    },
    Comparison {
        field: String,
        operator: String,
        #[serde(default)]
        value: Value,
    },
}

impl DataQueryExpressionDto {
    /// JSON text of the expression, used as error context
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Convert this node; errors carry the whole expression rooted at `root`
    fn convert(&self, root: &Self) -> QueryResult<DataQueryExpression> {
        let unsupported = |operator: &str| QueryError::UnsupportedOperator {
            operator: operator.to_string(),
            expression: root.to_json(),
        };

        match self {
            DataQueryExpressionDto::Combination { lhs, operator, rhs } => {
                let combinator =
                    Combinator::from_str(operator).ok_or_else(|| unsupported(operator))?;
                let lhs = lhs.convert(root)?;
                let rhs = rhs.convert(root)?;
                Ok(DataQueryExpression::combine(lhs, combinator, rhs))
            }
            DataQueryExpressionDto::Comparison {
                field,
                operator,
                value,
            } => {
                let operator =
                    ComparisonOperator::from_str(operator).ok_or_else(|| unsupported(operator))?;

                let field = DataField::parse(field).ok_or_else(|| QueryError::InvalidField {
                    field: field.clone(),
                    expression: root.to_json(),
                })?;

                Comparison::check_value(operator, value).map_err(|reason| {
                    QueryError::InvalidValue {
                        operator: operator.to_string(),
                        reason,
                        expression: root.to_json(),
                    }
                })?;

                Ok(DataQueryExpression::Comparison(Comparison {
                    field,
                    operator,
                    value: value.clone(),
                }))
            }
        }
    }
}

impl TryFrom<&DataQueryExpressionDto> for DataQueryExpression {
    type Error = QueryError;

    fn try_from(dto: &DataQueryExpressionDto) -> QueryResult<Self> {
        dto.convert(dto)
    }
}
