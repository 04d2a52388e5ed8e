use std::fs;

use expense_config::{default_app_dir, Config, ConfigError, ConfigManager};
use tempfile::tempdir;

#[test]
fn default_config_has_usable_values() {
    let cfg = Config::default();

    assert_eq!(cfg.log_filter, "expense_tracker=info");
    assert!(cfg.last_user.is_none());
    assert_eq!(cfg.backup_retention, 5);
    assert_eq!(cfg.resolve_data_root(), default_app_dir());
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"));

    assert_eq!(manager.load().expect("load config"), Config::default());
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let mut cfg = Config::default();
    cfg.backup_retention = 3;
    cfg.data_root = Some(dir.path().join("data"));
    cfg.last_user = Some("alice".into());

    manager.save(&cfg).expect("save config");
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded, cfg);
    assert_eq!(loaded.resolve_data_root(), dir.path().join("data"));
    assert!(manager.config_path().ends_with("config/config.json"));
}

#[test]
fn older_files_fill_in_new_fields() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{ "locale": "he-IL", "currency": "ILS", "last_user": "alice" }"#,
    )
    .expect("write");

    let loaded = ConfigManager::new(path).load().expect("load config");

    assert_eq!(loaded.last_user.as_deref(), Some("alice"));
    assert_eq!(loaded.backup_retention, Config::default_backup_retention());
    assert_eq!(loaded.log_filter, Config::default_log_filter());
}

#[test]
fn corrupt_file_reports_serde_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").expect("write");

    let err = ConfigManager::new(path).load().expect_err("must fail");

    assert!(matches!(err, ConfigError::Serde(_)));
}
