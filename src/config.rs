//! Configuration for reqdocs-storage

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::DbOptions;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reqdocs-storage")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage directory for the database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// SQLite file name inside `storage_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Maximum pooled SQLite connections
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// How long a connection waits on a locked database (milliseconds)
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Restart corrupt stored versions on update instead of refusing the save
    #[serde(default)]
    pub recover_malformed_versions: bool,
}

fn default_database_file() -> String {
    "records.db".to_string()
}

fn default_http_port() -> u16 {
    8095
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            database_file: default_database_file(),
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            pool_max_size: default_pool_max_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            recover_malformed_versions: false,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(&self.database_file)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Pool options for `RecordDb::open`
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            pool_max_size: self.pool_max_size,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}
