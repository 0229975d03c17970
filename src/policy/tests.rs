use super::*;
use crate::core::types::TaggedObject;

const OBJECT: TaggedObject = TaggedObject::File { content_id: 7 };

fn evidence() -> TagName {
    TagName::new(1, "Evidence", KnownStatus::Bad)
}

fn contraband() -> TagName {
    TagName::new(2, "Contraband", KnownStatus::Bad)
}

fn follow_up() -> TagName {
    TagName::new(3, "Follow Up", KnownStatus::Unknown)
}

fn tag(id: i64, name: TagName, comment: Option<&str>) -> Tag {
    Tag::new(id, name, comment, OBJECT)
}

#[test]
fn test_non_notable_change_writes_nothing() {
    let changed = tag(5, follow_up(), Some("look later"));
    let decision = NotabilityPolicy::decide(&[changed.clone()], &changed, TagChange::Added, None);
    assert!(!decision.should_write);

    let decision = NotabilityPolicy::decide(&[], &changed, TagChange::Removed, None);
    assert!(!decision.should_write);
}

#[test]
fn test_added_notable_tag_overwrites_comment() {
    let first = tag(10, evidence(), Some("flag1"));
    let second = tag(11, contraband(), Some("flag2"));

    let decision = NotabilityPolicy::decide(
        &[first, second.clone()],
        &second,
        TagChange::Added,
        Some("flag1"),
    );
    assert_eq!(decision.status, KnownStatus::Bad);
    assert_eq!(decision.comment, CommentUpdate::Set("flag2".into()));
    assert!(decision.should_write);
}

#[test]
fn test_added_notable_tag_without_comment_clears() {
    let added = tag(10, evidence(), None);
    let decision = NotabilityPolicy::decide(&[added.clone()], &added, TagChange::Added, Some("old"));
    assert_eq!(decision.status, KnownStatus::Bad);
    assert_eq!(decision.comment, CommentUpdate::Clear);
}

#[test]
fn test_removal_falls_back_to_remaining_notable_tag() {
    let first = tag(10, evidence(), Some("flag1"));
    let second = tag(11, contraband(), Some("flag2"));

    // Snapshot still containing the removed tag
    let decision = NotabilityPolicy::decide(
        &[first.clone(), second.clone()],
        &second,
        TagChange::Removed,
        Some("flag2"),
    );
    assert_eq!(decision.status, KnownStatus::Bad);
    assert_eq!(decision.comment, CommentUpdate::Set("flag1".into()));

    // Snapshot without it
    let decision = NotabilityPolicy::decide(&[first], &second, TagChange::Removed, Some("flag2"));
    assert_eq!(decision.comment, CommentUpdate::Set("flag1".into()));
}

#[test]
fn test_removal_of_last_notable_tag_clears_own_comment() {
    let only = tag(10, evidence(), Some("flag1"));
    let decision = NotabilityPolicy::decide(&[], &only, TagChange::Removed, Some("flag1"));
    assert_eq!(decision.status, KnownStatus::Unknown);
    assert_eq!(decision.comment, CommentUpdate::Clear);
}

#[test]
fn test_removal_of_last_notable_tag_preserves_foreign_comment() {
    let only = tag(10, evidence(), Some("flag1"));
    let decision =
        NotabilityPolicy::decide(&[], &only, TagChange::Removed, Some("written by examiner"));
    assert_eq!(decision.status, KnownStatus::Unknown);
    assert_eq!(decision.comment, CommentUpdate::Keep);
}

#[test]
fn test_non_notable_tags_do_not_keep_object_notable() {
    let removed = tag(10, evidence(), Some("flag1"));
    let other = tag(12, follow_up(), Some("later"));
    let decision = NotabilityPolicy::decide(&[other], &removed, TagChange::Removed, Some("flag1"));
    assert_eq!(decision.status, KnownStatus::Unknown);
    assert_eq!(decision.comment, CommentUpdate::Clear);
}

#[test]
fn test_definition_demotion_conflict() {
    let mut demoted = evidence();
    demoted.known_status = KnownStatus::Unknown;
    let tags = [
        tag(10, demoted.clone(), Some("flag1")),
        tag(11, contraband(), Some("flag2")),
    ];

    assert_eq!(
        NotabilityPolicy::decide_definition_change(&tags, &demoted, Some("flag2")),
        DefinitionDecision::ConflictSkipped
    );
}

#[test]
fn test_definition_demotion_without_conflict() {
    let mut demoted = evidence();
    demoted.known_status = KnownStatus::Unknown;
    let tags = [tag(10, demoted.clone(), Some("flag1"))];

    assert_eq!(
        NotabilityPolicy::decide_definition_change(&tags, &demoted, Some("flag1")),
        DefinitionDecision::Apply(Decision {
            status: KnownStatus::Unknown,
            comment: CommentUpdate::Clear,
            should_write: true,
        })
    );
    assert_eq!(
        NotabilityPolicy::decide_definition_change(&tags, &demoted, Some("examiner note")),
        DefinitionDecision::Apply(Decision {
            status: KnownStatus::Unknown,
            comment: CommentUpdate::Keep,
            should_write: true,
        })
    );
}

#[test]
fn test_definition_promotion_uses_most_recent_comment() {
    let mut promoted = follow_up();
    promoted.known_status = KnownStatus::Bad;
    let tags = [
        tag(10, evidence(), Some("flag1")),
        tag(15, promoted.clone(), Some("now notable")),
    ];

    assert_eq!(
        NotabilityPolicy::decide_definition_change(&tags, &promoted, None),
        DefinitionDecision::Apply(Decision {
            status: KnownStatus::Bad,
            comment: CommentUpdate::Set("now notable".into()),
            should_write: true,
        })
    );
}

#[test]
fn test_helpers() {
    let tags = [
        tag(3, evidence(), Some("old")),
        tag(9, follow_up(), Some("newest but not notable")),
        tag(8, contraband(), None),
    ];
    assert!(has_notable_tag(&tags));
    assert_eq!(most_recent_notable_tag(&tags).map(|t| t.id), Some(8));
    assert_eq!(most_recent_notable_comment(&tags), None);
    assert!(!has_notable_tag(&tags[1..2]));
}

mod property_tests {
    use proptest::prelude::*;

    use super::*;

    fn tag_set_strategy() -> impl Strategy<Value = Vec<Tag>> {
        prop::collection::btree_map(
            1i64..500,
            (prop::bool::ANY, prop::option::of("[a-z]{1,6}")),
            1..8,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(id, (notable, comment))| {
                    let name = if notable { evidence() } else { follow_up() };
                    Tag::new(id, name, comment.as_deref(), OBJECT)
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The decision depends on tag ids, never on snapshot order.
        #[test]
        fn prop_removal_independent_of_order(
            tags in tag_set_strategy(),
            removed_index in any::<prop::sample::Index>(),
            previous in prop::option::of("[a-z]{1,6}"),
        ) {
            let removed = tags[removed_index.index(tags.len())].clone();
            let mut reversed = tags.clone();
            reversed.reverse();

            let forward = NotabilityPolicy::decide(&tags, &removed, TagChange::Removed, previous.as_deref());
            let backward = NotabilityPolicy::decide(&reversed, &removed, TagChange::Removed, previous.as_deref());
            prop_assert_eq!(forward, backward);
        }

        /// A remaining notable tag always keeps the object notable with the
        /// comment of the highest remaining notable id.
        #[test]
        fn prop_removal_keeps_most_recent_notable(
            tags in tag_set_strategy(),
            removed_index in any::<prop::sample::Index>(),
        ) {
            let removed = tags[removed_index.index(tags.len())].clone();
            prop_assume!(removed.is_notable());

            let decision = NotabilityPolicy::decide(&tags, &removed, TagChange::Removed, None);
            let expected = tags
                .iter()
                .filter(|t| t.is_notable() && t.id != removed.id)
                .max_by_key(|t| t.id);

            match expected {
                Some(t) => {
                    prop_assert_eq!(decision.status, KnownStatus::Bad);
                    prop_assert_eq!(decision.comment, CommentUpdate::from_comment(t.comment.as_deref()));
                }
                None => prop_assert_eq!(decision.status, KnownStatus::Unknown),
            }
        }

        /// Re-applying a decision to the comment it produced changes nothing.
        #[test]
        fn prop_comment_update_idempotent(
            tags in tag_set_strategy(),
            changed_index in any::<prop::sample::Index>(),
            added in prop::bool::ANY,
            previous in prop::option::of("[a-z]{1,6}"),
        ) {
            let changed = tags[changed_index.index(tags.len())].clone();
            let change = if added { TagChange::Added } else { TagChange::Removed };

            let decision = NotabilityPolicy::decide(&tags, &changed, change, previous.as_deref());
            let once = decision.comment.apply(previous.as_deref());
            let twice = decision.comment.apply(once.as_deref());
            prop_assert_eq!(once, twice);
        }
    }
}
