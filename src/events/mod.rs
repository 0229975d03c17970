//! Case event routing
//!
//! Case events are translated into tasks and processed one at a time, in
//! arrival order, by a single worker. Serializing every read-then-write on
//! the correlation store through one lane is what keeps two rapid changes
//! to the same object from racing.

mod router;
mod task;


use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{CaseInfo, DataSourceInfo, Tag};

pub use router::{EventRouter, RouterStats, RouterStatsSnapshot};
pub use task::{Task, TaskOutcome};

/// Events emitted by the open case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseEvent {
    ContentTagAdded { tag: Tag },
    ContentTagDeleted { tag: Tag },
    ArtifactTagAdded { tag: Tag },
    ArtifactTagDeleted { tag: Tag },
    /// A tag definition was edited; carries its display name
    TagDefinitionChanged { display_name: String },
    DataSourceAdded { data_source: DataSourceInfo },
    DataSourceRenamed { object_id: i64, new_name: String },
    CaseOpened { case: CaseInfo },
    /// Any kind this crate does not handle
    #[serde(other)]
    Unrecognized,
}

impl CaseEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CaseEvent::ContentTagAdded { .. } => "CONTENT_TAG_ADDED",
            CaseEvent::ContentTagDeleted { .. } => "CONTENT_TAG_DELETED",
            CaseEvent::ArtifactTagAdded { .. } => "ARTIFACT_TAG_ADDED",
            CaseEvent::ArtifactTagDeleted { .. } => "ARTIFACT_TAG_DELETED",
            CaseEvent::TagDefinitionChanged { .. } => "TAG_DEFINITION_CHANGED",
            CaseEvent::DataSourceAdded { .. } => "DATA_SOURCE_ADDED",
            CaseEvent::DataSourceRenamed { .. } => "DATA_SOURCE_RENAMED",
            CaseEvent::CaseOpened { .. } => "CASE_OPENED",
            CaseEvent::Unrecognized => "UNRECOGNIZED",
        }
    }
}

/// How the router stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Process every queued task, then stop
    #[default]
    Drain,
    /// Finish the running task and drop the rest
    Cancel,
}

/// Event router errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Event router is shut down")]
    Closed,
}
