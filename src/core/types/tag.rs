//! Tag types
//!
//! Tags are owned by the case's tagging subsystem. This crate only reads
//! them, so every type here is a plain snapshot.

use serde::{Deserialize, Serialize};

use super::known::KnownStatus;

/// A user-defined tag definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TagName {
    /// Tag name identifier
    pub id: i64,
    /// Name shown to the examiner (unique per case)
    pub display_name: String,
    /// Status conferred on tagged objects (`Bad` or `Unknown`)
    pub known_status: KnownStatus,
}

impl TagName {
    pub fn new(id: i64, display_name: impl Into<String>, known_status: KnownStatus) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            known_status,
        }
    }

    /// Whether applying this tag marks an object notable
    pub fn is_notable(&self) -> bool {
        self.known_status.is_notable()
    }
}

/// The object a tag is applied to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaggedObject {
    /// A file (content object)
    File { content_id: i64 },
    /// A blackboard artifact and the content it was extracted from
    Artifact {
        artifact_id: i64,
        source_content_id: i64,
    },
}

impl TaggedObject {
    /// Content the object belongs to
    pub fn content_id(&self) -> i64 {
        match self {
            TaggedObject::File { content_id } => *content_id,
            TaggedObject::Artifact {
                source_content_id, ..
            } => *source_content_id,
        }
    }
}

impl std::fmt::Display for TaggedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaggedObject::File { content_id } => write!(f, "file {}", content_id),
            TaggedObject::Artifact { artifact_id, .. } => write!(f, "artifact {}", artifact_id),
        }
    }
}

/// A tag applied to a file or artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag {
    /// Tag identifier; monotonically increasing, defines recency
    pub id: i64,
    /// Tag definition at the time of the snapshot
    pub name: TagName,
    /// Examiner comment
    #[serde(default)]
    pub comment: Option<String>,
    /// Tagged object
    pub target: TaggedObject,
}

impl Tag {
    pub fn new(id: i64, name: TagName, comment: Option<&str>, target: TaggedObject) -> Self {
        Self {
            id,
            name,
            comment: comment.map(str::to_string),
            target,
        }
    }

    pub fn is_notable(&self) -> bool {
        self.name.is_notable()
    }
}
