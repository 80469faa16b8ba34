use super::*;

use domgraft_protocols::storage::keys;
use tempfile::TempDir;

#[test]
fn test_memory_store_basics() {
    let store = MemorySettingsStore::with_values([(keys::THEME, "dark")]);
    assert_eq!(store.get(keys::THEME).unwrap().as_deref(), Some("dark"));

    store.set(keys::CUSTOM_CSS, "body { margin: 0 }").unwrap();
    assert_eq!(store.keys().unwrap(), vec![keys::CUSTOM_CSS, keys::THEME]);

    store.remove(keys::THEME).unwrap();
    assert_eq!(store.get(keys::THEME).unwrap(), None);
}

#[test]
fn test_memory_store_bool_flags() {
    let store = MemorySettingsStore::new();
    let key = keys::plugin_enabled("theme");
    assert_eq!(store.get_bool(&key).unwrap(), None);

    store.set_bool(&key, true).unwrap();
    assert_eq!(store.get(&key).unwrap().as_deref(), Some("true"));
    assert_eq!(store.get_bool(&key).unwrap(), Some(true));

    store.set(&key, "yes").unwrap();
    assert!(matches!(
        store.get_bool(&key),
        Err(StorageError::InvalidValue { .. })
    ));
}

#[test]
fn test_file_store_persists_every_change() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let store = FileSettingsStore::open(&path).unwrap();
    store.set_bool(&keys::plugin_enabled("custom-css"), true).unwrap();
    store.set(keys::CUSTOM_CSS, "a { color: red }").unwrap();

    let on_disk: BTreeMap<String, String> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.len(), 2);
    assert_eq!(on_disk["plugins.custom-css.enabled"], "true");

    store.remove(keys::CUSTOM_CSS).unwrap();
    let on_disk: BTreeMap<String, String> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.len(), 1);
}

#[test]
fn test_file_store_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    {
        let store = FileSettingsStore::open(&path).unwrap();
        store.set(keys::THEME, "midnight").unwrap();
    }

    let reopened = FileSettingsStore::open(&path).unwrap();
    assert_eq!(reopened.get(keys::THEME).unwrap().as_deref(), Some("midnight"));
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn test_file_store_missing_and_empty_files() {
    let dir = TempDir::new().unwrap();
    let missing = FileSettingsStore::open(dir.path().join("absent.json")).unwrap();
    assert!(missing.keys().unwrap().is_empty());
    assert!(!dir.path().join("absent.json").exists());

    let empty_path = dir.path().join("empty.json");
    fs::write(&empty_path, "  \n").unwrap();
    let empty = FileSettingsStore::open(&empty_path).unwrap();
    assert!(empty.keys().unwrap().is_empty());
}

#[test]
fn test_file_store_rejects_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();

    let result = FileSettingsStore::open(&path);
    assert!(matches!(result, Err(StorageError::Serialization(_))));
}

#[test]
fn test_file_store_failed_write_keeps_memory_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let store = FileSettingsStore::open(&path).unwrap();
    store.set(keys::THEME, "light").unwrap();

    // Remove the directory so the next write fails.
    drop(dir);

    assert!(store.set(keys::THEME, "dark").is_err());
    assert_eq!(store.get(keys::THEME).unwrap().as_deref(), Some("light"));
}
