//! Plugin registry and lifecycle errors.

use thiserror::Error;

use super::{PatchError, StorageError};

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Plugin already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid plugin descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("Plugin '{plugin}' patch #{index} is invalid: {source}")]
    InvalidPatch {
        plugin: String,
        index: usize,
        #[source]
        source: PatchError,
    },

    #[error("Plugin '{plugin}' hook failed: {message}")]
    HookFailed { plugin: String, message: String },

    #[error("Settings storage error: {0}")]
    Storage(#[from] StorageError),
}
