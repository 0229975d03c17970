//! Tests for Configuration Module

use super::*;
use crate::events::ShutdownMode;
use tempfile::TempDir;

/// Create a test config store with temporary directory
async fn create_test_store() -> (ConfigStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let settings = ConfigStoreConfig {
        config_path: temp_dir.path().join("central_repository.json"),
        backup_dir: temp_dir.path().join("backups"),
        max_backups: 3,
        create_default: true,
    };

    let store = ConfigStore::new(settings).await.unwrap();
    (store, temp_dir)
}

#[tokio::test]
async fn test_create_default_config() {
    let (store, _temp) = create_test_store().await;

    let config = store.get().await;
    assert_eq!(config.version, 1);
    assert!(config.enabled);
    assert_eq!(config.database.backend, DatabaseBackend::Sqlite);
    assert_eq!(config.database.db_name, "central_repository");
    assert_eq!(config.router.shutdown_mode, ShutdownMode::Drain);
    assert!(store.config_path().exists());
}

#[tokio::test]
async fn test_update_persists() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ConfigStoreConfig {
        config_path: temp_dir.path().join("central_repository.json"),
        backup_dir: temp_dir.path().join("backups"),
        max_backups: 3,
        create_default: true,
    };

    {
        let store = ConfigStore::new(settings.clone()).await.unwrap();
        store
            .update(|config| config.router.shutdown_mode = ShutdownMode::Cancel)
            .await
            .unwrap();
    }

    let reopened = ConfigStore::new(settings).await.unwrap();
    assert_eq!(reopened.get().await.router.shutdown_mode, ShutdownMode::Cancel);
}

#[tokio::test]
async fn test_invalid_update_is_rejected() {
    let (store, _temp) = create_test_store().await;

    let mut database = store.get().await.database;
    database.db_name = "Central-Repo".to_string();
    let result = store.set_database(database).await;

    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    assert_eq!(store.get().await.database.db_name, "central_repository");
}

#[tokio::test]
async fn test_enabled_switch_is_broadcast() {
    let (store, _temp) = create_test_store().await;
    let mut receiver = store.subscribe_enabled();
    assert!(*receiver.borrow());

    store.set_enabled(false).await.unwrap();
    receiver.changed().await.unwrap();
    assert!(!*receiver.borrow_and_update());

    // Unrelated updates do not wake subscribers
    store
        .update(|config| config.database.busy_timeout_ms = 1000)
        .await
        .unwrap();
    assert!(!receiver.has_changed().unwrap());
}

#[tokio::test]
async fn test_backups_are_pruned() {
    let (store, _temp) = create_test_store().await;

    for timeout in [1000, 2000, 3000, 4000, 5000] {
        store
            .update(|config| config.database.busy_timeout_ms = timeout)
            .await
            .unwrap();
    }

    assert_eq!(store.list_backups().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_config_without_default() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ConfigStoreConfig {
        config_path: temp_dir.path().join("absent.json"),
        backup_dir: temp_dir.path().join("backups"),
        max_backups: 3,
        create_default: false,
    };

    assert!(matches!(
        ConfigStore::new(settings).await,
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_partial_json_uses_defaults() {
    let config: CentralRepoConfig =
        serde_json::from_str(r#"{"enabled": false, "database": {"backend": "memory"}}"#).unwrap();

    assert!(!config.enabled);
    assert_eq!(config.database.backend, DatabaseBackend::Memory);
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.router.shutdown_mode, ShutdownMode::Drain);
}

#[test]
fn test_database_settings_validation() {
    let valid = DatabaseSettings::default();
    assert!(valid.validate().is_ok());

    let cases = [
        DatabaseSettings {
            db_name: "9lives".to_string(),
            ..DatabaseSettings::default()
        },
        DatabaseSettings {
            max_connections: 0,
            ..DatabaseSettings::default()
        },
        DatabaseSettings {
            min_connections: 10,
            max_connections: 2,
            ..DatabaseSettings::default()
        },
        DatabaseSettings {
            busy_timeout_ms: 10_000_000,
            ..DatabaseSettings::default()
        },
    ];
    for settings in cases {
        assert!(settings.validate().is_err(), "{:?} should be rejected", settings);
    }

    // The in-memory backend ignores file settings
    let memory = DatabaseSettings {
        backend: DatabaseBackend::Memory,
        db_name: String::new(),
        ..DatabaseSettings::default()
    };
    assert!(memory.validate().is_ok());
}

#[test]
fn test_database_config_conversion() {
    let settings = DatabaseSettings {
        db_directory: "/var/lib/cr".into(),
        db_name: "lab_repo".to_string(),
        max_connections: 8,
        ..DatabaseSettings::default()
    };
    let config = settings.to_database_config();
    assert_eq!(config.db_path, std::path::PathBuf::from("/var/lib/cr/lab_repo.db"));
    assert_eq!(config.max_connections, 8);
}
