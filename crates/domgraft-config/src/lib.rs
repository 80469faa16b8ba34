//! # domgraft Config
//!
//! TOML configuration for the domgraft binary and the [`SettingsStore`]
//! implementations plugins persist their flags in.
//!
//! [`SettingsStore`]: domgraft_protocols::SettingsStore

mod error;
mod loader;
mod schema;
mod settings;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use settings::{FileSettingsStore, MemorySettingsStore};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
