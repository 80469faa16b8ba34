//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            headers: BTreeMap::new(),
            page_size: default_page_size(),
            delete_batch_size: default_delete_batch_size(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    50
}

fn default_delete_batch_size() -> usize {
    6
}

/// Patch engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on delivery rounds per document flush.
    #[serde(default = "default_max_flush_rounds")]
    pub max_flush_rounds: usize,

    /// Debounce window for plugins that coalesce host re-renders.
    #[serde(default = "default_debounce_ms")]
    pub default_debounce_ms: u64,
}

impl EngineConfig {
    pub fn default_debounce(&self) -> Duration {
        Duration::from_millis(self.default_debounce_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_flush_rounds: default_max_flush_rounds(),
            default_debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_max_flush_rounds() -> usize {
    64
}

fn default_debounce_ms() -> u64 {
    150
}

/// Where plugin settings are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON settings file. Defaults to `<data dir>/domgraft/settings.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// The settings file path with `~` expanded, or the platform default.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(ConfigLoader::expand_path(&path.to_string_lossy())),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("domgraft")
                .join("settings.json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    /// Directory for daily rolling log files; stderr only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
