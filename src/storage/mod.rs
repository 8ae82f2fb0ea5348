//! Record storage
//!
//! - **timestamp**: Store timestamp text format
//! - **types**: Transaction records and search queries
//! - **schema**: Record table DDL and column layout
//! - **session**: SQLite session pool
//! - **store**: The `RecordStore` trait and its SQLite implementation
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   RecordStore::insert → session → INSERT ... RETURNING id
//!
//! Read Path:
//!   TransactionRecordQuery → build_filter → session → SELECT → decode rows
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use payments_sor::storage::{
//!     RecordStore, SessionConfig, SessionPool, SqliteRecordStore, TransactionRecordQuery,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SessionPool::open("./data/sor.db", &SessionConfig::default());
//!     let store = SqliteRecordStore::new(pool)?;
//!
//!     let data = serde_json::Map::new();
//!     store.insert("tx-1", chrono::Utc::now(), "CREATED", &data).await?;
//!
//!     let records = store.search(&TransactionRecordQuery::all().unique_id_like("tx")).await?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod schema;
pub mod session;
pub mod store;
pub mod timestamp;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use session::{Session, SessionConfig, SessionPool};
pub use store::{RecordStore, SqliteRecordStore};
pub use timestamp::TimestampError;
pub use types::{
    RecordData, TimestampRange, TransactionRecord, TransactionRecordId, TransactionRecordQuery,
    UniqueTransactionId,
};
