//! Record Store
//!
//! Persists and retrieves transaction records.
//!
//! # Session discipline
//!
//! Every operation checks out exactly one session on a blocking worker,
//! executes one statement, and drops the session before returning. Failures
//! are logged here, once, with the statement and bind names (never the bound
//! values), then returned unchanged. There is no retry at this layer.
//!
//! # Ordering
//!
//! Results are ordered by `transactionRecordId`, the store-assigned
//! sequence. `insertTimestamp` is never used for ordering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{named_params, Connection, Row};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::query::{build_filter, CompiledFilter};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{RecordColumn, SCHEMA_SQL, TABLE_NAME};
use crate::storage::session::SessionPool;
use crate::storage::timestamp;
use crate::storage::types::{
    RecordData, TransactionRecord, TransactionRecordId, TransactionRecordQuery,
};

/// Persistence operations for transaction records.
///
/// Append-only: there is no update or delete.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one record and return its store-assigned id
    async fn insert(
        &self,
        unique_id: &str,
        event_timestamp: DateTime<Utc>,
        event_type: &str,
        data: &RecordData,
    ) -> StorageResult<TransactionRecordId>;

    /// Every record carrying `unique_id`, in insertion order
    async fn query_by_unique_id(&self, unique_id: &str) -> StorageResult<Vec<TransactionRecord>>;

    /// Every record matching `query`, in insertion order. No match is an empty list.
    async fn search(&self, query: &TransactionRecordQuery)
        -> StorageResult<Vec<TransactionRecord>>;

    /// Cheap round trip proving the store is reachable and the schema exists
    async fn test_connection(&self) -> StorageResult<()>;
}

/// Raw row as read from SQLite, before timestamp and payload decoding
#[derive(Debug, Clone)]
struct RecordRow {
    transaction_record_id: i64,
    unique_id: String,
    insert_timestamp: String,
    event_timestamp: String,
    event_type: String,
    data: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            transaction_record_id: row.get(RecordColumn::TransactionRecordId.index())?,
            unique_id: row.get(RecordColumn::UniqueId.index())?,
            insert_timestamp: row.get(RecordColumn::InsertTimestamp.index())?,
            event_timestamp: row.get(RecordColumn::EventTimestamp.index())?,
            event_type: row.get(RecordColumn::EventType.index())?,
            data: row.get(RecordColumn::Data.index())?,
        })
    }
}

impl TryFrom<RecordRow> for TransactionRecord {
    type Error = StorageError;

    fn try_from(row: RecordRow) -> StorageResult<Self> {
        let data = match serde_json::from_str(&row.data)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(StorageError::Corruption(format!(
                    "record {} has non-object data: {}",
                    row.transaction_record_id, other
                )))
            }
        };

        Ok(TransactionRecord {
            transaction_record_id: row.transaction_record_id,
            unique_id: row.unique_id,
            insert_timestamp: timestamp::decode(&row.insert_timestamp)?,
            event_timestamp: timestamp::decode(&row.event_timestamp)?,
            event_type: row.event_type,
            data,
        })
    }
}

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SessionPool,
    schema_ready: Arc<AtomicBool>,
}

/// Create the database directory and the record table if missing
fn apply_schema(pool: &SessionPool) -> StorageResult<()> {
    pool.create_parent_dir()?;
    let session = pool.session()?;
    session.execute_batch(SCHEMA_SQL).map_err(|e| {
        tracing::error!(error = %e, "Failed to apply record schema");
        StorageError::from(e)
    })
}

impl SqliteRecordStore {
    /// Wrap a session pool, creating the record table now
    pub fn new(pool: SessionPool) -> StorageResult<Self> {
        apply_schema(&pool)?;
        Ok(Self {
            pool,
            schema_ready: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Wrap a session pool without touching the database.
    ///
    /// The directory and record table are created by the first successful
    /// `test_connection`, which must run before any other operation.
    pub fn deferred(pool: SessionPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The underlying session pool
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Run `f` against one pooled session on a blocking worker
    async fn with_session<T, F>(&self, operation: &'static str, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let session = pool.session()?;
            f(&*session)
        })
        .await
        .map_err(StorageError::from)
        .and_then(|inner| inner);

        // statement failures are logged with their SQL inside `f`
        if let Err(e @ (StorageError::Pool(_) | StorageError::Task(_))) = &result {
            tracing::error!(operation, error = %e, "Record store operation failed");
        }

        result
    }
}

const INSERT_SQL: &str = "INSERT INTO transactionRecord (uniqueId, eventTimestamp, eventType, data)
     VALUES (:uniqueId, :eventTimestamp, :eventType, :data)
     RETURNING transactionRecordId";

/// SELECT statement for a filter; no WHERE clause when the filter is empty
fn select_sql(filter: &str) -> String {
    let mut sql = format!("SELECT {} FROM {}", RecordColumn::select_list(), TABLE_NAME);
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(RecordColumn::TransactionRecordId.name());
    sql.push_str(" ASC");
    sql
}

fn log_statement_failure(operation: &str, sql: &str, filter: &CompiledFilter, e: &StorageError) {
    tracing::error!(
        operation,
        sql = %sql,
        params = ?filter.value_names(),
        error = %e,
        "Executing SQL query failed"
    );
}

/// Execute a filtered SELECT and decode every row
fn select_records(
    conn: &Connection,
    operation: &str,
    filter: &CompiledFilter,
) -> StorageResult<Vec<TransactionRecord>> {
    let sql = select_sql(&filter.filter);

    let run = || -> StorageResult<Vec<TransactionRecord>> {
        let names = filter.sql_parameter_names();
        let params: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .zip(&filter.values)
            .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params.as_slice(), RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(TransactionRecord::try_from).collect()
    };

    let result = run();
    if let Err(e) = &result {
        log_statement_failure(operation, &sql, filter, e);
    }
    result
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(
        &self,
        unique_id: &str,
        event_timestamp: DateTime<Utc>,
        event_type: &str,
        data: &RecordData,
    ) -> StorageResult<TransactionRecordId> {
        let unique_id = unique_id.to_string();
        let event_type = event_type.to_string();
        let event_timestamp = timestamp::encode(&event_timestamp);
        let data = serde_json::to_string(data)?;

        let id = self
            .with_session("insert", move |conn| {
                conn.query_row(
                    INSERT_SQL,
                    named_params! {
                        ":uniqueId": unique_id,
                        ":eventTimestamp": event_timestamp,
                        ":eventType": event_type,
                        ":data": data,
                    },
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| {
                    let e = StorageError::from(e);
                    tracing::error!(
                        operation = "insert",
                        sql = INSERT_SQL,
                        unique_id = %unique_id,
                        error = %e,
                        "Executing SQL query failed"
                    );
                    e
                })
            })
            .await?;

        tracing::debug!(transaction_record_id = id, "Inserted transaction record");
        Ok(id)
    }

    async fn query_by_unique_id(&self, unique_id: &str) -> StorageResult<Vec<TransactionRecord>> {
        let filter = CompiledFilter {
            filter: format!("{} = :id", RecordColumn::UniqueId.name()),
            values: vec![("id".to_string(), unique_id.into())],
        };

        let records = self
            .with_session("query_by_unique_id", move |conn| {
                select_records(conn, "query_by_unique_id", &filter)
            })
            .await?;

        tracing::debug!(unique_id = %unique_id, count = records.len(), "Fetched records by unique id");
        Ok(records)
    }

    async fn search(
        &self,
        query: &TransactionRecordQuery,
    ) -> StorageResult<Vec<TransactionRecord>> {
        let filter = build_filter(query);

        tracing::debug!(
            filter = %filter.filter,
            params = ?filter.value_names(),
            "Query processed"
        );

        let records = self
            .with_session("search", move |conn| select_records(conn, "search", &filter))
            .await?;

        tracing::debug!(count = records.len(), "Search complete");
        Ok(records)
    }

    async fn test_connection(&self) -> StorageResult<()> {
        if !self.schema_ready.load(Ordering::Acquire) {
            let pool = self.pool.clone();
            tokio::task::spawn_blocking(move || apply_schema(&pool)).await??;
            self.schema_ready.store(true, Ordering::Release);
            tracing::info!(path = %self.pool.path().display(), "Record schema ready");
        }

        self.with_session("test_connection", |conn| {
            let sql = format!("SELECT 1 FROM {} LIMIT 1", TABLE_NAME);
            conn.prepare(&sql)?.exists([])?;
            Ok(())
        })
        .await
    }
}
