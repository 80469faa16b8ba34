//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::schema::Config;

/// Default config file name looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "domgraft.toml";

const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loading configuration");
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Config::default()),
        }
    }

    /// `<config dir>/domgraft/domgraft.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("domgraft").join(CONFIG_FILE_NAME))
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(ENV_VAR_PATTERN).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut missing = None;
        let expanded = re.replace_all(content, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(ConfigError::EnvVarNotSet(name)),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
