use super::*;
use crate::core::types::{KnownStatus, TaggedObject};

fn file(content_id: i64) -> TaggedObject {
    TaggedObject::File { content_id }
}

fn notable() -> TagName {
    TagName::new(1, "Evidence", KnownStatus::Bad)
}

#[tokio::test]
async fn test_tags_on_content_and_artifact() {
    let index = InMemoryTagIndex::new();
    index.add_tag(Tag::new(10, notable(), Some("flag1"), file(7)));
    index.add_tag(Tag::new(
        11,
        notable(),
        None,
        TaggedObject::Artifact {
            artifact_id: 70,
            source_content_id: 7,
        },
    ));

    let on_file = index.tags_on_content(7).await.unwrap();
    assert_eq!(on_file.len(), 1);
    assert_eq!(on_file[0].id, 10);

    let on_artifact = index.tags_on_artifact(70).await.unwrap();
    assert_eq!(on_artifact.len(), 1);
    assert_eq!(on_artifact[0].id, 11);

    assert_eq!(index.tags_by_name(1).await.unwrap().len(), 2);
    assert!(index.tags_on_content(8).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_change_updates_tag_snapshots() {
    let index = InMemoryTagIndex::new();
    index.add_tag(Tag::new(10, notable(), None, file(7)));

    let updated = index.set_tag_name_status(1, KnownStatus::Unknown).unwrap();
    assert_eq!(updated.known_status, KnownStatus::Unknown);

    let tags = index.tags_on_content(7).await.unwrap();
    assert!(!tags[0].is_notable());

    assert!(index.set_tag_name_status(99, KnownStatus::Bad).is_none());
}

#[tokio::test]
async fn test_lookup_by_display_name() {
    let index = InMemoryTagIndex::new();
    index.add_tag_name(notable());

    let found = index.tag_name_by_display_name("Evidence").await.unwrap();
    assert_eq!(found, Some(notable()));
    assert_eq!(index.tag_name_by_display_name("Nope").await.unwrap(), None);
}

#[tokio::test]
async fn test_remove_tag() {
    let index = InMemoryTagIndex::new();
    index.add_tag(Tag::new(10, notable(), None, file(7)));

    assert_eq!(index.remove_tag(10).map(|t| t.id), Some(10));
    assert!(index.remove_tag(10).is_none());
    assert!(index.tags_on_content(7).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_case_fails_queries() {
    let index = InMemoryTagIndex::new();
    index.set_case_open(false);

    assert_eq!(index.tags_on_content(1).await, Err(CaseDataError::NoOpenCase));
    assert_eq!(
        index.tag_name_by_display_name("Evidence").await,
        Err(CaseDataError::NoOpenCase)
    );
}
