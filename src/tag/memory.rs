//! In-memory tag index

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{TagIndex, TagResult};
use crate::core::error::CaseDataError;
use crate::core::types::{KnownStatus, Tag, TagName, TaggedObject};

#[derive(Debug, Default)]
struct TagIndexState {
    case_open: bool,
    names: HashMap<i64, TagName>,
    /// Ordered by tag id
    tags: BTreeMap<i64, Tag>,
}

/// Tag index held in process memory
///
/// Used by embedders that mirror the case tags themselves and by the test
/// suites. Tag snapshots always carry the current definition of their name.
#[derive(Debug)]
pub struct InMemoryTagIndex {
    state: RwLock<TagIndexState>,
}

impl Default for InMemoryTagIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTagIndex {
    /// Create an index for an open case with no tags
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TagIndexState {
                case_open: true,
                ..Default::default()
            }),
        }
    }

    /// Register or replace a tag definition
    pub fn add_tag_name(&self, name: TagName) {
        let mut state = self.state.write();
        for tag in state.tags.values_mut().filter(|t| t.name.id == name.id) {
            tag.name = name.clone();
        }
        state.names.insert(name.id, name);
    }

    /// Apply a tag; its definition is registered when missing
    pub fn add_tag(&self, tag: Tag) {
        let mut state = self.state.write();
        let name = state
            .names
            .entry(tag.name.id)
            .or_insert_with(|| tag.name.clone())
            .clone();
        state.tags.insert(tag.id, Tag { name, ..tag });
    }

    /// Remove a tag, returning it when it was present
    pub fn remove_tag(&self, tag_id: i64) -> Option<Tag> {
        self.state.write().tags.remove(&tag_id)
    }

    /// Change the status conferred by a tag definition
    pub fn set_tag_name_status(&self, tag_name_id: i64, status: KnownStatus) -> Option<TagName> {
        let mut state = self.state.write();
        let name = state.names.get_mut(&tag_name_id)?;
        name.known_status = status;
        let updated = name.clone();
        for tag in state.tags.values_mut().filter(|t| t.name.id == tag_name_id) {
            tag.name = updated.clone();
        }
        Some(updated)
    }

    /// Mark the case closed; every query then fails
    pub fn set_case_open(&self, open: bool) {
        self.state.write().case_open = open;
    }

    fn query<F>(&self, filter: F) -> TagResult<Vec<Tag>>
    where
        F: Fn(&Tag) -> bool,
    {
        let state = self.state.read();
        if !state.case_open {
            return Err(CaseDataError::NoOpenCase);
        }
        Ok(state.tags.values().filter(|t| filter(t)).cloned().collect())
    }
}

#[async_trait]
impl TagIndex for InMemoryTagIndex {
    async fn tags_on_content(&self, content_id: i64) -> TagResult<Vec<Tag>> {
        self.query(|t| matches!(t.target, TaggedObject::File { content_id: id } if id == content_id))
    }

    async fn tags_on_artifact(&self, artifact_id: i64) -> TagResult<Vec<Tag>> {
        self.query(|t| matches!(t.target, TaggedObject::Artifact { artifact_id: id, .. } if id == artifact_id))
    }

    async fn tags_by_name(&self, tag_name_id: i64) -> TagResult<Vec<Tag>> {
        self.query(|t| t.name.id == tag_name_id)
    }

    async fn tag_name_by_display_name(&self, display_name: &str) -> TagResult<Option<TagName>> {
        let state = self.state.read();
        if !state.case_open {
            return Err(CaseDataError::NoOpenCase);
        }
        Ok(state
            .names
            .values()
            .find(|n| n.display_name == display_name)
            .cloned())
    }
}
