//! Durable key/value settings storage.

use crate::error::StorageError;

/// String key/value store that survives reloads.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Read a boolean flag stored as `"true"`/`"false"`.
    ///
    /// Any other stored value is reported as [`StorageError::InvalidValue`].
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        match self.get(key)?.as_deref() {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(StorageError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.set(key, if value { "true" } else { "false" })
    }
}

/// Well-known setting keys.
pub mod keys {
    /// Custom stylesheet injected by the `custom-css` plugin.
    pub const CUSTOM_CSS: &str = "settings.customCss";

    /// Selected visual theme name.
    pub const THEME: &str = "settings.theme";

    /// Key holding a plugin's enabled flag.
    pub fn plugin_enabled(name: &str) -> String {
        format!("plugins.{}.enabled", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_enabled_key() {
        assert_eq!(keys::plugin_enabled("custom-css"), "plugins.custom-css.enabled");
    }
}
