use super::*;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "http://127.0.0.1:8080/api");
    assert_eq!(config.api.page_size, 50);
    assert_eq!(config.api.delete_batch_size, 6);
    assert_eq!(config.api.connect_timeout(), Duration::from_secs(10));
    assert_eq!(config.api.request_timeout(), Duration::from_secs(30));
    assert!(config.api.headers.is_empty());
    assert_eq!(config.engine.max_flush_rounds, 64);
    assert_eq!(config.engine.default_debounce(), Duration::from_millis(150));
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json);
    assert!(config.logging.directory.is_none());
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config: Config = toml::from_str(
        r#"
        [api]
        page_size = 10
        "#,
    )
    .unwrap();
    assert_eq!(config.api.page_size, 10);
    assert_eq!(config.api.delete_batch_size, 6);
    assert_eq!(config.engine, EngineConfig::default());
}

#[test]
fn test_headers_table() {
    let config: Config = toml::from_str(
        r#"
        [api.headers]
        Authorization = "Bearer abc"
        X-Client = "domgraft"
        "#,
    )
    .unwrap();
    assert_eq!(config.api.headers.len(), 2);
    assert_eq!(config.api.headers["X-Client"], "domgraft");
}

#[test]
fn test_storage_default_path() {
    let path = StorageConfig::default().resolved_path();
    assert!(path.ends_with("domgraft/settings.json"));
}

#[test]
fn test_storage_path_expands_tilde() {
    let storage = StorageConfig {
        path: Some(PathBuf::from("~/domgraft.json")),
    };
    let path = storage.resolved_path();
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with("domgraft.json"));
}

#[test]
fn test_round_trip_through_toml() {
    let mut config = Config::default();
    config.logging.json = true;
    config.api.headers.insert("X-Trace".to_string(), "1".to_string());

    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
