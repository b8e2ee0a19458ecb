//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How long a connection waits on another writer before reporting a
/// concurrency conflict.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "labflow_core=info";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What material consumption does when stock would go below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Accept the consumption and log a warning
    #[default]
    AllowNegative,
    /// Refuse the consumption with a constraint violation
    RejectNegative,
}

impl StockPolicy {
    pub fn allows_negative(self) -> bool {
        self == StockPolicy::AllowNegative
    }
}

/// Lab configuration. Every field has a default, so a partial JSON file is
/// valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Busy timeout for write-lock contention
    pub busy_timeout_ms: u64,
    /// Negative stock handling
    pub stock_policy: StockPolicy,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("labflow.db"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            stock_policy: StockPolicy::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LabConfig {
    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
