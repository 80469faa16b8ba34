//! Settings stores.
//!
//! [`MemorySettingsStore`] keeps everything in a map and is used by tests and
//! the offline demo. [`FileSettingsStore`] mirrors the map to a JSON object on
//! disk, rewriting the file on every change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use domgraft_protocols::{SettingsStore, StorageError};

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.values.lock().keys().cloned().collect())
    }
}

/// JSON-file backed settings.
///
/// The whole file is read once in [`open`](Self::open); after that the
/// in-memory copy is authoritative and every write rewrites the file.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettingsStore {
    /// Open the store at `path`, creating parent directories. A missing file
    /// starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created settings directory: {:?}", parent);
            }
        }

        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str::<BTreeMap<String, String>>(&content)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = values.len(), "Opened settings store");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and persist. The in-memory map only changes if the
    /// write succeeds.
    fn update<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut values = self.values.lock();
        let mut next = values.clone();
        change(&mut next);
        if next == *values {
            return Ok(());
        }

        let content = serde_json::to_string_pretty(&next)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        *values = next;
        debug!(path = %self.path.display(), "Settings written");
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.values.lock().keys().cloned().collect())
    }
}
