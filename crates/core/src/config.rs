//! Configuration management
//!
//! Loads `config.toml` from the xfer config directory. A missing file is not
//! an error: every setting has a default matching the tool's built-in limits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "XFER_CONFIG_DIR";

/// Hard ceiling of keys per bulk-delete request imposed by the store API
pub const MAX_DELETE_BATCH: usize = 1000;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transfer: TransferConfig,
    pub retry: RetryConfig,
    pub store: StoreConfig,
}

/// Worker pool and batching limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Upper bound on concurrent transfers; the pool is `min(max_workers, items)`
    pub max_workers: usize,
    /// Tasks handed to the worker pool per submission batch
    pub batch_size: usize,
    /// Keys per bulk-delete request
    pub delete_batch_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_workers: 32,
            batch_size: 1000,
            delete_batch_size: MAX_DELETE_BATCH,
        }
    }
}

/// Retry policy for per-item store calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
        }
    }
}

/// Connection settings for the store client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Static credentials; the default provider chain is used when absent
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub force_path_style: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
            connect_timeout_secs: 5,
            read_timeout_secs: 60,
        }
    }
}

impl Config {
    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.transfer.max_workers == 0 {
            return Err(Error::Config("transfer.max_workers must be at least 1".into()));
        }
        if self.transfer.batch_size == 0 {
            return Err(Error::Config("transfer.batch_size must be at least 1".into()));
        }
        if self.transfer.delete_batch_size == 0
            || self.transfer.delete_batch_size > MAX_DELETE_BATCH
        {
            return Err(Error::Config(format!(
                "transfer.delete_batch_size must be between 1 and {MAX_DELETE_BATCH}"
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.store.access_key.is_some() != self.store.secret_key.is_some() {
            return Err(Error::Config(
                "store.access_key and store.secret_key must be set together".into(),
            ));
        }
        Ok(())
    }
}

/// Locates, reads and writes the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use the default location, honoring `XFER_CONFIG_DIR`
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .map(|d| d.join("xfer"))
                .ok_or_else(|| Error::Config("Cannot determine config directory".into()))?,
        };
        Ok(Self::with_dir(dir))
    }

    /// Use `config.toml` inside an explicit directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join("config.toml"),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load and validate the configuration; defaults when the file is absent
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("{}: {e}", self.config_path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }
}
