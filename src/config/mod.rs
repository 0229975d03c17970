//! Configuration Management Module
//!
//! Provides persistent configuration storage with:
//! - JSON file-based storage
//! - Validation of the repository database settings
//! - Change notification for the repository enabled switch

mod storage;
#[cfg(test)]
mod tests;

pub use storage::{
    CentralRepoConfig, ConfigError, ConfigResult, ConfigStore, ConfigStoreConfig, DatabaseBackend,
    DatabaseSettings, RouterSettings,
};
