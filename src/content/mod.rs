//! Case content lookup
//!
//! The forensic case database is an external collaborator. The engine only
//! needs the open case, files (with MD5 and known status), artifacts (with
//! their attributes) and data sources, so that is all [`CaseContent`]
//! exposes.

mod memory;

use async_trait::async_trait;

use crate::core::error::CaseDataError;
use crate::core::types::{ArtifactInfo, CaseInfo, DataSourceInfo, FileInfo};

pub use memory::InMemoryCaseContent;

/// Result type for case content lookups
pub type ContentResult<T> = std::result::Result<T, CaseDataError>;

/// Lookups into the open case
#[async_trait]
pub trait CaseContent: Send + Sync {
    /// The open case
    async fn case_info(&self) -> ContentResult<CaseInfo>;

    /// A file by object id
    async fn file(&self, content_id: i64) -> ContentResult<Option<FileInfo>>;

    /// An artifact by id
    async fn artifact(&self, artifact_id: i64) -> ContentResult<Option<ArtifactInfo>>;

    /// A data source by object id
    async fn data_source(&self, object_id: i64) -> ContentResult<Option<DataSourceInfo>>;
}
