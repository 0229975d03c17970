//! Correlation store
//!
//! Abstraction over the relational correlation repository. The sync engine
//! only ever touches the repository through [`CorrelationStore`]; the
//! known-status upsert is the sole write path for instance status.
//!
//! Two implementations are provided:
//! - [`SqliteCorrelationStore`]: the repository database (sqlx)
//! - [`MemoryCorrelationStore`]: a process-local store for tests and for
//!   running without a repository database

mod error;
mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseSettings};
use crate::core::types::{
    CaseInfo, CorrelationAttributeInstance, CorrelationCase, CorrelationDataSource, DataSourceInfo,
    InstanceKey, KnownStatus,
};

pub use error::StoreError;
pub use memory::MemoryCorrelationStore;
pub use sqlite::SqliteCorrelationStore;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// How an upsert treats the stored comment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommentUpdate {
    /// Leave the stored comment unchanged (absent on insert)
    #[default]
    Keep,
    /// Replace the stored comment
    Set(String),
    /// Remove the stored comment
    Clear,
}

impl CommentUpdate {
    /// `Set` for a present comment, `Clear` otherwise
    pub fn from_comment(comment: Option<&str>) -> Self {
        match comment {
            Some(c) => CommentUpdate::Set(c.to_string()),
            None => CommentUpdate::Clear,
        }
    }

    /// Comment after applying this update to `current`
    pub fn apply(&self, current: Option<&str>) -> Option<String> {
        match self {
            CommentUpdate::Keep => current.map(str::to_string),
            CommentUpdate::Set(c) => Some(c.clone()),
            CommentUpdate::Clear => None,
        }
    }
}

/// Storage backend for correlation cases, data sources and instances
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Fetch the instance with the given identity
    async fn find(&self, key: &InstanceKey) -> StoreResult<Option<CorrelationAttributeInstance>>;

    /// Set the known status and comment of an instance
    ///
    /// Inserts the instance when absent. Applying the same arguments twice
    /// leaves the store in the same state as applying them once.
    async fn upsert_known_status(
        &self,
        key: &InstanceKey,
        status: KnownStatus,
        comment: &CommentUpdate,
        object_id: Option<i64>,
    ) -> StoreResult<()>;

    /// Look up a case by its unique name
    async fn get_case(&self, case_name: &str) -> StoreResult<Option<CorrelationCase>>;

    /// Create the case, or return the existing one with the same name
    async fn new_case(&self, case: &CaseInfo) -> StoreResult<CorrelationCase>;

    /// Look up a data source of a case by its case-database object id
    async fn get_data_source(
        &self,
        case_id: i64,
        object_id: i64,
    ) -> StoreResult<Option<CorrelationDataSource>>;

    /// Create the data source, or return the existing one
    async fn new_data_source(
        &self,
        case_id: i64,
        data_source: &DataSourceInfo,
    ) -> StoreResult<CorrelationDataSource>;

    /// Rename a data source
    async fn update_data_source_name(&self, data_source_id: i64, name: &str) -> StoreResult<()>;

    /// Release resources held by the store
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Open the store selected by the repository database settings
pub async fn open_store(settings: &DatabaseSettings) -> crate::Result<Arc<dyn CorrelationStore>> {
    settings.validate()?;
    match settings.backend {
        DatabaseBackend::Sqlite => {
            let store = SqliteCorrelationStore::open(&settings.to_database_config()).await?;
            Ok(Arc::new(store))
        }
        DatabaseBackend::Memory => {
            info!("Using in-memory correlation store; nothing will be persisted");
            Ok(Arc::new(MemoryCorrelationStore::new()))
        }
    }
}
