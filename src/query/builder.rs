//! Record Query Builder
//!
//! Combines the top-level fields of a `TransactionRecordQuery` with the
//! compiled data expression into one `CompiledFilter`.
//!
//! Predicates are emitted in a fixed order, each only when present:
//!
//! ```text
//! uniqueId LIKE :uid
//! eventType IN (:et0, :et1, ...)
//! eventTimestamp >= :etsf      eventTimestamp <= :etst
//! insertTimestamp >= :itsf     insertTimestamp <= :itst
//! (<data expression>)
//! ```
//!
//! joined by `AND`. Timestamp bounds are bound in store format so they
//! compare correctly against the stored text columns.

use chrono::{DateTime, Utc};

use crate::query::compiler;
use crate::query::filter::{BindValue, CompiledFilter};
use crate::storage::schema::RecordColumn;
use crate::storage::timestamp;
use crate::storage::types::{TimestampRange, TransactionRecordQuery};

/// Accumulates predicates joined by `AND`
#[derive(Default)]
struct FilterWriter {
    filter: String,
    values: Vec<(String, BindValue)>,
}

impl FilterWriter {
    fn push_predicate(&mut self, predicate: &str) {
        if !self.filter.is_empty() {
            self.filter.push_str(" AND ");
        }
        self.filter.push_str(predicate);
    }

    fn bind(&mut self, name: impl Into<String>, value: impl Into<BindValue>) {
        self.values.push((name.into(), value.into()));
    }

    fn push_timestamp_range(&mut self, column: RecordColumn, range: &TimestampRange, prefix: &str) {
        if let Some(from) = range.from {
            self.push_bound(column, ">=", &format!("{}f", prefix), &from);
        }
        if let Some(to) = range.to {
            self.push_bound(column, "<=", &format!("{}t", prefix), &to);
        }
    }

    fn push_bound(&mut self, column: RecordColumn, op: &str, name: &str, at: &DateTime<Utc>) {
        self.push_predicate(&format!("{} {} :{}", column.name(), op, name));
        self.bind(name, timestamp::encode(at));
    }

    fn finish(self) -> CompiledFilter {
        CompiledFilter {
            filter: self.filter,
            values: self.values,
        }
    }
}

/// Build the filter and ordered bind values for a record search
pub fn build_filter(query: &TransactionRecordQuery) -> CompiledFilter {
    let mut writer = FilterWriter::default();

    if let Some(fragment) = query.unique_id_like.as_deref().filter(|s| !s.is_empty()) {
        writer.push_predicate(&format!("{} LIKE :uid", RecordColumn::UniqueId.name()));
        writer.bind("uid", format!("%{}%", fragment));
    }

    if let Some(event_types) = query.event_types.as_ref().filter(|t| !t.is_empty()) {
        let names: Vec<String> = (0..event_types.len()).map(|i| format!("et{}", i)).collect();
        let placeholders: Vec<String> = names.iter().map(|n| format!(":{}", n)).collect();

        writer.push_predicate(&format!(
            "{} IN ({})",
            RecordColumn::EventType.name(),
            placeholders.join(", ")
        ));
        for (name, event_type) in names.into_iter().zip(event_types) {
            writer.bind(name, event_type.as_str());
        }
    }

    if let Some(range) = &query.event_timestamp {
        writer.push_timestamp_range(RecordColumn::EventTimestamp, range, "ets");
    }

    if let Some(range) = &query.insert_timestamp {
        writer.push_timestamp_range(RecordColumn::InsertTimestamp, range, "its");
    }

    let data = compiler::compile(query.data_query_expression.as_ref());
    if !data.is_empty() {
        writer.push_predicate(&format!("({})", data.filter));
        writer.values.extend(data.values);
    }

    writer.finish()
}
