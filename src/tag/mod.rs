//! Tag index
//!
//! Read-only view over the case's tagging subsystem. The sync engine asks
//! it for the full tag set of an object before every decision, and for all
//! objects carrying a tag name when a definition changes.
//!
//! Results are snapshots; no consistency is assumed between two calls.

mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::core::error::CaseDataError;
use crate::core::types::{Tag, TagName};

pub use memory::InMemoryTagIndex;

/// Result type for tag index queries
pub type TagResult<T> = std::result::Result<T, CaseDataError>;

/// Queries over the tags of the open case
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Tags applied directly to a file
    async fn tags_on_content(&self, content_id: i64) -> TagResult<Vec<Tag>>;

    /// Tags applied to an artifact
    async fn tags_on_artifact(&self, artifact_id: i64) -> TagResult<Vec<Tag>>;

    /// Every file and artifact tag using the given tag name
    async fn tags_by_name(&self, tag_name_id: i64) -> TagResult<Vec<Tag>>;

    /// Resolve a tag definition from its display name
    async fn tag_name_by_display_name(&self, display_name: &str) -> TagResult<Option<TagName>>;
}
