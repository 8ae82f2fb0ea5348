//! Payments System of Record server
//!
//! Run with: cargo run -- --config ./config.toml
//!
//! # Configuration
//!
//! Without `--config`, the default locations are searched and environment
//! variables are applied on top (see `payments_sor::config`):
//! - `LISTEN_HOST`, `LISTEN_PORT`
//! - `DB_PATH`, `DB_CONNECTION_LIMIT`, `DB_POOL_QUEUE_TIMEOUT`, `DB_POOL_IDLE_TIME`
//! - `DB_CONNECT_RETRY_INTERVAL_MS`, `DB_CONNECT_MAX_ATTEMPTS`
//! - `SOR_LOG_LEVEL`, `SOR_LOG_FORMAT`
//! - `RUST_LOG`: overrides the log filter

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use payments_sor::api::{serve, AppState};
use payments_sor::bootstrap::{init_tracing, wait_for_store};
use payments_sor::config::{generate_default_config, Config};
use payments_sor::records::RecordService;
use payments_sor::storage::{SessionPool, SqliteRecordStore};

#[derive(Parser)]
#[command(name = "payments-sor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Payments system of record for transaction records")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting payments system of record v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database.path);

    let pool = SessionPool::open(&config.database.path, &config.database.session_config());
    let store = Arc::new(SqliteRecordStore::deferred(pool));

    wait_for_store(store.as_ref(), &config.bootstrap)
        .await
        .context("database never became reachable")?;

    let state = AppState::new(RecordService::new(store), config.api.clone());
    serve(state, &config.api).await?;

    tracing::info!("Payments system of record stopped");
    Ok(())
}
