//! Process startup helpers
//!
//! Logging initialization and the startup database connectivity check.

use backon::{ConstantBuilder, Retryable};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{BootstrapConfig, LoggingConfig};
use crate::storage::{RecordStore, StorageError, StorageResult};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `logging.level` applies to this crate
/// and to `tower_http`. `logging.format = "json"` selects structured output.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "payments_sor={level},tower_http={level}",
            level = config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Fixed-delay backoff for the startup connectivity check
pub fn connection_backoff(config: &BootstrapConfig) -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(Duration::from_millis(config.retry_interval_ms))
        .with_max_times(config.max_attempts)
}

/// Block until the store answers `test_connection`, retrying at a fixed
/// interval. Returns the last error once the attempts are exhausted.
pub async fn wait_for_store(store: &dyn RecordStore, config: &BootstrapConfig) -> StorageResult<()> {
    (|| async move { store.test_connection().await })
        .retry(connection_backoff(config))
        .notify(|err: &StorageError, dur: Duration| {
            warn!(error = %err, delay = ?dur, "Database connection failed, retrying");
        })
        .await?;

    info!("Database connection verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        RecordData, SessionConfig, SessionPool, SqliteRecordStore, TransactionRecord,
        TransactionRecordId, TransactionRecordQuery,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose connection check fails a fixed number of times
    struct FlakyStore {
        failures: usize,
        attempts: AtomicUsize,
    }

    impl FlakyStore {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn insert(
            &self,
            _unique_id: &str,
            _event_timestamp: DateTime<Utc>,
            _event_type: &str,
            _data: &RecordData,
        ) -> StorageResult<TransactionRecordId> {
            unimplemented!()
        }

        async fn query_by_unique_id(&self, _unique_id: &str) -> StorageResult<Vec<TransactionRecord>> {
            unimplemented!()
        }

        async fn search(
            &self,
            _query: &TransactionRecordQuery,
        ) -> StorageResult<Vec<TransactionRecord>> {
            unimplemented!()
        }

        async fn test_connection(&self) -> StorageResult<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "database unavailable",
                )))
            } else {
                Ok(())
            }
        }
    }

    fn fast_retry(max_attempts: usize) -> BootstrapConfig {
        BootstrapConfig {
            retry_interval_ms: 1,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_wait_for_store_recovers() {
        let store = FlakyStore::new(2);

        wait_for_store(&store, &fast_retry(5)).await.unwrap();
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_for_store_gives_up() {
        let store = FlakyStore::new(usize::MAX);

        let err = wait_for_store(&store, &fast_retry(2)).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        // first attempt plus two retries
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_for_store_outlasts_unreachable_database() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let config = SessionConfig {
            connection_timeout_ms: 200,
            ..Default::default()
        };
        let store = SqliteRecordStore::deferred(SessionPool::open(blocker.join("sor.db"), &config));

        let unblock = {
            let blocker = blocker.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                std::fs::remove_file(blocker).unwrap();
            })
        };

        let retry = BootstrapConfig {
            retry_interval_ms: 10,
            max_attempts: 200,
        };
        wait_for_store(&store, &retry).await.unwrap();
        unblock.await.unwrap();

        assert!(blocker.join("sor.db").exists());
    }
}
