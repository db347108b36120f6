//! Configuration loading and management
//!
//! Handles parsing of the `todo.toml` file kept in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::task::Priority;
use crate::view::{Filter, SortKey};

/// File name of the configuration inside the data directory
pub const CONFIG_FILE: &str = "todo.toml";

/// Upper bound for `storage.lock_timeout_ms`
const MAX_LOCK_TIMEOUT_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Task creation defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Initial view state for a session
    #[serde(default)]
    pub view: ViewConfig,

    /// Storage tuning
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TasksConfig {
    /// Priority for `todo add` without `-p`
    #[serde(default)]
    pub default_priority: Priority,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewConfig {
    #[serde(default)]
    pub filter: Filter,

    #[serde(default)]
    pub sort_by: SortKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// How long a write waits for the record lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `todo.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| crate::error::Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `todo.toml` from a data directory; defaults when it is absent
    pub fn load_from_dir(data_dir: &Path) -> crate::error::Result<Self> {
        let config_path = Self::path_in(data_dir);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load(&config_path)
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.storage.validate()
    }
}

impl StorageConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.lock_timeout_ms > MAX_LOCK_TIMEOUT_MS {
            return Err(crate::error::Error::InvalidConfig(format!(
                "storage.lock_timeout_ms must be <= {MAX_LOCK_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}
