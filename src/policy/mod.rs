//! Notability policy
//!
//! Pure decision functions: given the full tag set currently applied to an
//! object, what known status and comment should its correlation instances
//! carry. Nothing here touches the store.
//!
//! Rules:
//! - an object is notable while at least one applied tag is notable
//! - the comment of a notable instance is the comment of the most recent
//!   notable tag, where recency is the tag id
//! - when the last notable tag goes away the comment is cleared only if it
//!   is still the one that tag wrote

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::core::types::{KnownStatus, Tag, TagName};
use crate::store::CommentUpdate;

/// Kind of tag change being applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagChange {
    Added,
    Removed,
}

/// Outcome of a policy evaluation for one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: KnownStatus,
    pub comment: CommentUpdate,
    /// False when the change has no bearing on the instance
    pub should_write: bool,
}

impl Decision {
    /// A decision that writes nothing
    pub fn no_write() -> Self {
        Self {
            status: KnownStatus::Unknown,
            comment: CommentUpdate::Keep,
            should_write: false,
        }
    }

    fn write(status: KnownStatus, comment: CommentUpdate) -> Self {
        Self {
            status,
            comment,
            should_write: true,
        }
    }
}

/// Outcome of re-evaluating an object after its tag definition changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionDecision {
    Apply(Decision),
    /// Demotion skipped: another notable tag still applies to the object
    ConflictSkipped,
}

/// Decision functions over an object's tag set
#[derive(Debug, Clone, Copy, Default)]
pub struct NotabilityPolicy;

impl NotabilityPolicy {
    /// Decide the effect of one tag being added or removed
    ///
    /// `current_tags` is the object's tag set as read after the change; the
    /// changed tag is excluded by id when it was removed, whether or not the
    /// snapshot still contains it.
    pub fn decide(
        current_tags: &[Tag],
        changed_tag: &Tag,
        change: TagChange,
        previous_comment: Option<&str>,
    ) -> Decision {
        if !changed_tag.is_notable() {
            return Decision::no_write();
        }

        match change {
            TagChange::Added => Decision::write(
                KnownStatus::Bad,
                CommentUpdate::from_comment(changed_tag.comment.as_deref()),
            ),
            TagChange::Removed => {
                let remaining = current_tags.iter().filter(|t| t.id != changed_tag.id);
                match most_recent_notable_tag(remaining) {
                    Some(tag) => Decision::write(
                        KnownStatus::Bad,
                        CommentUpdate::from_comment(tag.comment.as_deref()),
                    ),
                    None => {
                        let comment = if changed_tag.comment.as_deref() == previous_comment {
                            CommentUpdate::Clear
                        } else {
                            CommentUpdate::Keep
                        };
                        Decision::write(KnownStatus::Unknown, comment)
                    }
                }
            }
        }
    }

    /// Decide the effect of a tag definition's status changing
    ///
    /// `current_tags` carry the new definition. A demotion is skipped while
    /// a notable tag of a different name still applies, so the object keeps
    /// its notable status.
    pub fn decide_definition_change(
        current_tags: &[Tag],
        tag_name: &TagName,
        previous_comment: Option<&str>,
    ) -> DefinitionDecision {
        if tag_name.is_notable() {
            return match most_recent_notable_tag(current_tags.iter()) {
                Some(tag) => DefinitionDecision::Apply(Decision::write(
                    KnownStatus::Bad,
                    CommentUpdate::from_comment(tag.comment.as_deref()),
                )),
                None => DefinitionDecision::Apply(Decision::no_write()),
            };
        }

        let conflicting = current_tags
            .iter()
            .any(|t| t.is_notable() && t.name.id != tag_name.id);
        if conflicting {
            return DefinitionDecision::ConflictSkipped;
        }

        let written_by_this_name = previous_comment.is_some()
            && current_tags
                .iter()
                .filter(|t| t.name.id == tag_name.id)
                .any(|t| t.comment.as_deref() == previous_comment);
        let comment = if written_by_this_name {
            CommentUpdate::Clear
        } else {
            CommentUpdate::Keep
        };
        DefinitionDecision::Apply(Decision::write(KnownStatus::Unknown, comment))
    }
}

/// Whether any tag in the set is notable
pub fn has_notable_tag(tags: &[Tag]) -> bool {
    tags.iter().any(Tag::is_notable)
}

/// The notable tag with the highest id
pub fn most_recent_notable_tag<'a, I>(tags: I) -> Option<&'a Tag>
where
    I: IntoIterator<Item = &'a Tag>,
{
    tags.into_iter()
        .filter(|t| t.is_notable())
        .max_by_key(|t| t.id)
}

/// Comment of the most recent notable tag
pub fn most_recent_notable_comment(tags: &[Tag]) -> Option<&str> {
    most_recent_notable_tag(tags).and_then(|t| t.comment.as_deref())
}
