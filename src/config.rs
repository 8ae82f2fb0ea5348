//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::storage::SessionConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Maximum number of pooled sessions
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,

    /// How long a request waits for a free session
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_ms: u64,

    /// Idle sessions are closed after this long; 0 keeps them open
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("payments-sor").join("sor.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./sor_data/sor.db".to_string())
}

fn default_pool_size() -> u32 {
    10
}

fn default_busy_timeout() -> u32 {
    5000
}

fn default_connection_timeout() -> u64 {
    5000
}

fn default_idle_timeout() -> u64 {
    60_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout(),
            connection_timeout_ms: default_connection_timeout(),
            idle_timeout_ms: default_idle_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Session pool settings derived from this config
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            pool_size: self.pool_size.max(1),
            busy_timeout_ms: self.busy_timeout_ms,
            connection_timeout_ms: self.connection_timeout_ms,
            idle_timeout_ms: (self.idle_timeout_ms > 0).then_some(self.idle_timeout_ms),
        }
    }
}

/// Startup connectivity check
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// Delay between connection attempts
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// Retries after the first attempt before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_retry_interval() -> u64 {
    1000
}

fn default_max_attempts() -> usize {
    30
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("payments-sor").join("config.toml")),
            Some(PathBuf::from("/etc/payments-sor/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = lookup("LISTEN_HOST") {
            self.api.host = host;
        }
        set_parsed(&mut self.api.port, lookup("LISTEN_PORT"));

        // Database overrides
        if let Some(path) = lookup("DB_PATH") {
            self.database.path = path;
        }
        set_parsed(&mut self.database.pool_size, lookup("DB_CONNECTION_LIMIT"));
        set_parsed(&mut self.database.connection_timeout_ms, lookup("DB_POOL_QUEUE_TIMEOUT"));
        set_parsed(&mut self.database.idle_timeout_ms, lookup("DB_POOL_IDLE_TIME"));

        // Bootstrap overrides
        set_parsed(
            &mut self.bootstrap.retry_interval_ms,
            lookup("DB_CONNECT_RETRY_INTERVAL_MS"),
        );
        set_parsed(&mut self.bootstrap.max_attempts, lookup("DB_CONNECT_MAX_ATTEMPTS"));

        // Logging overrides
        if let Some(level) = lookup("SOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SOR_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, value: Option<String>) {
    if let Some(parsed) = value.and_then(|v| v.trim().parse().ok()) {
        *target = parsed;
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    let db_path = toml::Value::String(default_db_path()).to_string();

    format!(
        r#"# Payments System of Record Configuration
#
# Environment variables override these settings:
# - LISTEN_HOST, LISTEN_PORT
# - DB_PATH, DB_CONNECTION_LIMIT, DB_POOL_QUEUE_TIMEOUT, DB_POOL_IDLE_TIME
# - DB_CONNECT_RETRY_INTERVAL_MS, DB_CONNECT_MAX_ATTEMPTS
# - SOR_LOG_LEVEL, SOR_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 3000

# Maximum request body size (bytes)
max_body_size = 1048576

[database]
# SQLite database file
path = {db_path}

# Maximum number of pooled sessions
pool_size = 10

# How long SQLite waits on a locked database (ms)
busy_timeout_ms = 5000

# How long a request waits for a free session (ms)
connection_timeout_ms = 5000

# Idle sessions are closed after this long (ms, 0 = never)
idle_timeout_ms = 60000

[bootstrap]
# Delay between startup connection attempts (ms)
retry_interval_ms = 1000

# Retries before startup gives up
max_attempts = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    )
}
