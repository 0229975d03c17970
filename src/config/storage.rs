//! Configuration Storage Implementation
//!
//! Provides JSON file-based configuration storage with:
//! - Atomic writes using temp file + rename
//! - Automatic backup before writes
//! - Validation before anything is persisted
//! - A watch channel broadcasting the repository enabled switch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::db::{DatabaseConfig, SynchronousMode};
use crate::events::ShutdownMode;

lazy_static! {
    static ref DB_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid db name regex");
}

const MAX_CONNECTIONS_LIMIT: u32 = 100;
const MAX_BUSY_TIMEOUT_MS: u32 = 600_000;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration store settings
#[derive(Debug, Clone)]
pub struct ConfigStoreConfig {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Path to backup directory
    pub backup_dir: PathBuf,
    /// Maximum number of backups to keep
    pub max_backups: usize,
    /// Whether to create default config if not exists
    pub create_default: bool,
}

impl Default for ConfigStoreConfig {
    fn default() -> Self {
        let app_data = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("correlation-sync");

        Self {
            config_path: app_data.join("central_repository.json"),
            backup_dir: app_data.join("backups"),
            max_backups: 5,
            create_default: true,
        }
    }
}

/// Central repository configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CentralRepoConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Whether correlation propagation is active
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub router: RouterSettings,

    /// Last modified timestamp
    #[serde(default = "default_timestamp")]
    pub last_modified: String,
}

fn default_version() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

fn default_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for CentralRepoConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            enabled: default_enabled(),
            database: DatabaseSettings::default(),
            router: RouterSettings::default(),
            last_modified: default_timestamp(),
        }
    }
}

impl CentralRepoConfig {
    /// Check every setting
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()
    }
}

/// Repository backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// SQLite database file
    #[default]
    Sqlite,
    /// Process-local store; nothing is persisted
    Memory,
}

/// Repository database settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// Directory holding the database file
    #[serde(default = "default_db_directory")]
    pub db_directory: PathBuf,

    /// Database name; the file is `<name>.db`
    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_wal")]
    pub enable_wal: bool,

    #[serde(default)]
    pub synchronous: SynchronousMode,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

fn default_db_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("correlation-sync")
}

fn default_db_name() -> String {
    "central_repository".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_wal() -> bool {
    cfg!(feature = "wal")
}

fn default_busy_timeout() -> u32 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            db_directory: default_db_directory(),
            db_name: default_db_name(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            enable_wal: default_wal(),
            synchronous: SynchronousMode::default(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Full path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.db_directory.join(format!("{}.db", self.db_name))
    }

    /// Pool configuration for these settings
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            db_path: self.db_path(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            enable_wal: self.enable_wal,
            synchronous: self.synchronous,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend == DatabaseBackend::Memory {
            return Ok(());
        }
        if self.db_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database directory is empty".to_string()));
        }
        if !DB_NAME.is_match(&self.db_name) {
            return Err(ConfigError::Invalid(format!(
                "database name '{}' must start with a lower-case letter and contain only lower-case letters, digits and underscores",
                self.db_name
            )));
        }
        if self.max_connections == 0 || self.max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_connections must be between 1 and {}",
                MAX_CONNECTIONS_LIMIT
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid(
                "min_connections exceeds max_connections".to_string(),
            ));
        }
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "busy_timeout_ms must not exceed {}",
                MAX_BUSY_TIMEOUT_MS
            )));
        }
        Ok(())
    }
}

/// Event router settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouterSettings {
    /// Behavior of the router when the store shuts down
    #[serde(default)]
    pub shutdown_mode: ShutdownMode,
}

/// Configuration store with thread-safe access
pub struct ConfigStore {
    config: Arc<RwLock<CentralRepoConfig>>,
    settings: ConfigStoreConfig,
    enabled: watch::Sender<bool>,
}

impl ConfigStore {
    /// Create a new configuration store
    pub async fn new(settings: ConfigStoreConfig) -> ConfigResult<Self> {
        if let Some(parent) = settings.config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::create_dir_all(&settings.backup_dir).await?;

        let config = if settings.config_path.exists() {
            Self::load_from_file(&settings.config_path).await?
        } else if settings.create_default {
            let default_config = CentralRepoConfig::default();
            Self::save_to_file(&settings.config_path, &default_config).await?;
            default_config
        } else {
            return Err(ConfigError::NotFound(settings.config_path.clone()));
        };
        config.validate()?;

        let (enabled, _) = watch::channel(config.enabled);
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            settings,
            enabled,
        })
    }

    /// Load configuration from file
    async fn load_from_file(path: &Path) -> ConfigResult<CentralRepoConfig> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: CentralRepoConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file with atomic write
    async fn save_to_file(path: &Path, config: &CentralRepoConfig) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(config)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }

    /// Get current configuration (read-only)
    pub async fn get(&self) -> CentralRepoConfig {
        self.config.read().await.clone()
    }

    /// Update configuration
    ///
    /// The updated configuration is validated before it is saved; an
    /// invalid update leaves both memory and disk untouched.
    pub async fn update<F>(&self, updater: F) -> ConfigResult<CentralRepoConfig>
    where
        F: FnOnce(&mut CentralRepoConfig),
    {
        let mut config = self.config.write().await;

        let mut updated = config.clone();
        updater(&mut updated);
        updated.validate()?;
        updated.last_modified = default_timestamp();

        self.create_backup(&config).await?;
        Self::save_to_file(&self.settings.config_path, &updated).await?;

        *config = updated;
        self.enabled.send_if_modified(|current| {
            let changed = *current != config.enabled;
            *current = config.enabled;
            changed
        });

        Ok(config.clone())
    }

    /// Turn correlation propagation on or off
    pub async fn set_enabled(&self, enabled: bool) -> ConfigResult<CentralRepoConfig> {
        self.update(|config| config.enabled = enabled).await
    }

    /// Replace the database settings
    pub async fn set_database(&self, database: DatabaseSettings) -> ConfigResult<CentralRepoConfig> {
        self.update(|config| config.database = database).await
    }

    /// Receiver following the enabled switch
    pub fn subscribe_enabled(&self) -> watch::Receiver<bool> {
        self.enabled.subscribe()
    }

    /// Create a backup of current configuration
    async fn create_backup(&self, config: &CentralRepoConfig) -> ConfigResult<()> {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.f");
        let backup_name = format!("config_backup_{}.json", timestamp);
        let backup_path = self.settings.backup_dir.join(backup_name);

        Self::save_to_file(&backup_path, config).await?;
        self.cleanup_old_backups().await?;

        Ok(())
    }

    /// Remove old backups exceeding max_backups limit
    async fn cleanup_old_backups(&self) -> ConfigResult<()> {
        let mut backups = self.list_backups().await?;
        while backups.len() > self.settings.max_backups {
            let oldest = backups.remove(0);
            tokio::fs::remove_file(&oldest).await?;
        }
        Ok(())
    }

    /// List available backups, oldest first
    pub async fn list_backups(&self) -> ConfigResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.settings.backup_dir).await?;
        let mut backups: Vec<PathBuf> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                backups.push(path);
            }
        }

        backups.sort();
        Ok(backups)
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.settings.config_path
    }
}
