//! # Payments System of Record
//!
//! An append-only store for payment transaction records. Each record is an
//! immutable event tied to a caller-supplied unique transaction id; the full
//! history of a transaction can be replayed, and records can be searched by
//! id fragment, event type, time range and a boolean expression over the
//! JSON payload.
//!
//! ## Modules
//!
//! - [`storage`]: Timestamp codec, session pool and the SQLite record store
//! - [`query`]: Data query expressions and the search filter builder
//! - [`records`]: External record shapes and the record service
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//! - [`bootstrap`]: Logging setup and the startup connectivity check
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payments_sor::records::{RecordService, TransactionRecordQueryDto};
//! use payments_sor::storage::{SessionConfig, SessionPool, SqliteRecordStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SessionPool::open("./sor.db", &SessionConfig::default());
//!     let service = RecordService::new(Arc::new(SqliteRecordStore::new(pool)?));
//!
//!     let records = service.search(TransactionRecordQueryDto::default()).await?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod query;
pub mod records;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    RecordStore, SessionPool, SqliteRecordStore, StorageError, StorageResult, TransactionRecord,
    TransactionRecordQuery,
};

pub use query::{build_filter, CompiledFilter, DataQueryExpression, QueryError};

pub use records::{RecordError, RecordService, TransactionRecordDto, TransactionRecordQueryDto};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
