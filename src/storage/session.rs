//! Session provider
//!
//! A pool of SQLite connections (`r2d2` + `r2d2_sqlite`). The record store
//! checks out one session per operation and returns it by dropping it, so
//! the session is released on every exit path, including errors and panics.
//!
//! The pool is built without connecting. A database that is unreachable at
//! startup surfaces on the first checkout, where the caller can retry.
//!
//! New connections are configured by [`PragmaCustomizer`]: WAL journal,
//! busy timeout for concurrent writers, and cache tuning.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::error::StorageResult;

/// A checked-out connection; returned to the pool on drop
pub type Session = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of open connections
    pub pool_size: u32,
    /// How long SQLite waits on a locked database before failing (ms)
    pub busy_timeout_ms: u32,
    /// How long a caller waits for a free session before failing (ms)
    pub connection_timeout_ms: u64,
    /// Idle connections above the minimum are closed after this long (ms)
    pub idle_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pool_size: 10,
            busy_timeout_ms: 5_000,
            connection_timeout_ms: 5_000,
            idle_timeout_ms: Some(60_000),
        }
    }
}

/// Pragmas applied to each new connection
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        // busy_timeout first so the WAL switch waits out a concurrent opener
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = 10000;
             PRAGMA temp_store = MEMORY;",
            self.busy_timeout_ms
        ))
    }
}

/// Pool of sessions against one database file
#[derive(Clone)]
pub struct SessionPool {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl SessionPool {
    /// Create a pool for the database at `path`. No connection is made yet.
    pub fn open(path: impl AsRef<Path>, config: &SessionConfig) -> Self {
        let path = path.as_ref().to_path_buf();

        let manager = SqliteConnectionManager::file(&path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
            }))
            .build_unchecked(manager);

        tracing::info!(
            path = %path.display(),
            pool_size = config.pool_size,
            "Created database session pool"
        );

        Self { pool, path }
    }

    /// Create the directory holding the database file if it is missing
    pub fn create_parent_dir(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Check out a session. Blocks up to the configured connection timeout.
    pub fn session(&self) -> StorageResult<Session> {
        Ok(self.pool.get()?)
    }

    /// Maximum pool size
    pub fn max_size(&self) -> u32 {
        self.pool.max_size()
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
