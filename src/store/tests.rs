//! Tests for the correlation stores
//!
//! Behavioral checks run against both implementations so the in-memory
//! store stays a faithful stand-in for the repository database.

use tempfile::TempDir;

use super::*;
use crate::core::types::correlation::{EMAIL_TYPE_ID, FILES_TYPE_ID};
use crate::db::DatabaseConfig;

async fn sqlite_store() -> (SqliteCorrelationStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::with_path(temp_dir.path().join("central.db"));
    let store = SqliteCorrelationStore::open(&config).await.unwrap();
    (store, temp_dir)
}

async fn setup_case(store: &dyn CorrelationStore) -> (CorrelationCase, CorrelationDataSource) {
    let case = store
        .new_case(&CaseInfo::new("case-2024-001", "Burglary"))
        .await
        .unwrap();
    let data_source = store
        .new_data_source(
            case.id,
            &DataSourceInfo {
                object_id: 1,
                name: "laptop.E01".to_string(),
                device_id: "dev-1".to_string(),
                md5: None,
            },
        )
        .await
        .unwrap();
    (case, data_source)
}

fn file_key(case: &CorrelationCase, data_source: &CorrelationDataSource) -> InstanceKey {
    InstanceKey {
        type_id: FILES_TYPE_ID,
        case_id: case.id,
        data_source_id: data_source.id,
        value: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
        file_path: "/img/a.jpg".to_string(),
    }
}

async fn check_upsert_inserts_when_absent(store: &dyn CorrelationStore) {
    let (case, ds) = setup_case(store).await;
    let key = file_key(&case, &ds);

    assert!(store.find(&key).await.unwrap().is_none());

    store
        .upsert_known_status(&key, KnownStatus::Bad, &CommentUpdate::Set("flag1".into()), Some(10))
        .await
        .unwrap();

    let instance = store.find(&key).await.unwrap().unwrap();
    assert_eq!(instance.known_status, KnownStatus::Bad);
    assert_eq!(instance.comment.as_deref(), Some("flag1"));
    assert_eq!(instance.object_id, Some(10));
}

async fn check_upsert_comment_updates(store: &dyn CorrelationStore) {
    let (case, ds) = setup_case(store).await;
    let key = file_key(&case, &ds);

    store
        .upsert_known_status(&key, KnownStatus::Bad, &CommentUpdate::Set("flag1".into()), None)
        .await
        .unwrap();

    // Keep leaves the comment alone
    store
        .upsert_known_status(&key, KnownStatus::Unknown, &CommentUpdate::Keep, None)
        .await
        .unwrap();
    let instance = store.find(&key).await.unwrap().unwrap();
    assert_eq!(instance.known_status, KnownStatus::Unknown);
    assert_eq!(instance.comment.as_deref(), Some("flag1"));

    // Clear removes it
    store
        .upsert_known_status(&key, KnownStatus::Unknown, &CommentUpdate::Clear, None)
        .await
        .unwrap();
    let instance = store.find(&key).await.unwrap().unwrap();
    assert_eq!(instance.comment, None);
}

async fn check_upsert_idempotent(store: &dyn CorrelationStore) {
    let (case, ds) = setup_case(store).await;
    let key = file_key(&case, &ds);
    let comment = CommentUpdate::Set("contraband".into());

    store
        .upsert_known_status(&key, KnownStatus::Bad, &comment, Some(5))
        .await
        .unwrap();
    let once = store.find(&key).await.unwrap();
    store
        .upsert_known_status(&key, KnownStatus::Bad, &comment, Some(5))
        .await
        .unwrap();
    let twice = store.find(&key).await.unwrap();

    assert_eq!(once, twice);
}

async fn check_case_and_data_source_upserts(store: &dyn CorrelationStore) {
    let (case, ds) = setup_case(store).await;

    let again = store
        .new_case(&CaseInfo::new("case-2024-001", "Other display"))
        .await
        .unwrap();
    assert_eq!(again.id, case.id);
    assert_eq!(again.display_name, "Burglary");
    assert_eq!(store.get_case("case-2024-001").await.unwrap(), Some(case.clone()));
    assert!(store.get_case("missing").await.unwrap().is_none());

    let ds_again = store
        .new_data_source(
            case.id,
            &DataSourceInfo {
                object_id: 1,
                name: "renamed.E01".to_string(),
                device_id: "dev-1".to_string(),
                md5: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(ds_again.id, ds.id);

    store.update_data_source_name(ds.id, "laptop-final.E01").await.unwrap();
    let renamed = store.get_data_source(case.id, 1).await.unwrap().unwrap();
    assert_eq!(renamed.name, "laptop-final.E01");

    assert!(matches!(
        store.update_data_source_name(9999, "x").await,
        Err(StoreError::DataSourceNotFound { data_source_id: 9999 })
    ));
    assert!(matches!(
        store
            .new_data_source(
                9999,
                &DataSourceInfo {
                    object_id: 2,
                    name: "x".into(),
                    device_id: "y".into(),
                    md5: None,
                }
            )
            .await,
        Err(StoreError::CaseNotFound { case_id: 9999 })
    ));
}

async fn check_unknown_type_rejected(store: &dyn CorrelationStore) {
    let (case, ds) = setup_case(store).await;
    let mut key = file_key(&case, &ds);
    key.type_id = 4242;

    assert!(matches!(
        store.find(&key).await,
        Err(StoreError::UnknownType { type_id: 4242 })
    ));
    assert!(matches!(
        store
            .upsert_known_status(&key, KnownStatus::Bad, &CommentUpdate::Keep, None)
            .await,
        Err(StoreError::UnknownType { type_id: 4242 })
    ));
}

#[tokio::test]
async fn test_sqlite_upsert_inserts_when_absent() {
    let (store, _dir) = sqlite_store().await;
    check_upsert_inserts_when_absent(&store).await;
}

#[tokio::test]
async fn test_memory_upsert_inserts_when_absent() {
    check_upsert_inserts_when_absent(&MemoryCorrelationStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_upsert_comment_updates() {
    let (store, _dir) = sqlite_store().await;
    check_upsert_comment_updates(&store).await;
}

#[tokio::test]
async fn test_memory_upsert_comment_updates() {
    check_upsert_comment_updates(&MemoryCorrelationStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_upsert_idempotent() {
    let (store, _dir) = sqlite_store().await;
    check_upsert_idempotent(&store).await;
}

#[tokio::test]
async fn test_memory_upsert_idempotent() {
    check_upsert_idempotent(&MemoryCorrelationStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_case_and_data_source_upserts() {
    let (store, _dir) = sqlite_store().await;
    check_case_and_data_source_upserts(&store).await;
}

#[tokio::test]
async fn test_memory_case_and_data_source_upserts() {
    check_case_and_data_source_upserts(&MemoryCorrelationStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_unknown_type_rejected() {
    let (store, _dir) = sqlite_store().await;
    check_unknown_type_rejected(&store).await;
}

#[tokio::test]
async fn test_memory_unknown_type_rejected() {
    check_unknown_type_rejected(&MemoryCorrelationStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_disabled_type_rejected() {
    let (store, _dir) = sqlite_store().await;
    let (case, ds) = setup_case(&store).await;
    let mut key = file_key(&case, &ds);
    key.type_id = EMAIL_TYPE_ID;
    key.value = "suspect@example.com".to_string();

    store.set_type_enabled(EMAIL_TYPE_ID, false).await.unwrap();
    assert!(matches!(
        store
            .upsert_known_status(&key, KnownStatus::Bad, &CommentUpdate::Keep, None)
            .await,
        Err(StoreError::TypeDisabled { .. })
    ));

    store.set_type_enabled(EMAIL_TYPE_ID, true).await.unwrap();
    store
        .upsert_known_status(&key, KnownStatus::Bad, &CommentUpdate::Keep, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sqlite_store_reopens_with_data() {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::with_path(temp_dir.path().join("central.db"));

    let key = {
        let store = SqliteCorrelationStore::open(&config).await.unwrap();
        let (case, ds) = setup_case(&store).await;
        let key = file_key(&case, &ds);
        store
            .upsert_known_status(&key, KnownStatus::Bad, &CommentUpdate::Set("kept".into()), None)
            .await
            .unwrap();
        store.close().await.unwrap();
        key
    };

    let store = SqliteCorrelationStore::open(&config).await.unwrap();
    let instance = store.find(&key).await.unwrap().unwrap();
    assert_eq!(instance.comment.as_deref(), Some("kept"));
}

#[test]
fn test_comment_update_apply() {
    assert_eq!(CommentUpdate::Keep.apply(Some("a")), Some("a".to_string()));
    assert_eq!(CommentUpdate::Keep.apply(None), None);
    assert_eq!(CommentUpdate::Set("b".into()).apply(Some("a")), Some("b".to_string()));
    assert_eq!(CommentUpdate::Clear.apply(Some("a")), None);
    assert_eq!(CommentUpdate::from_comment(None), CommentUpdate::Clear);
}

#[test]
fn test_transient_errors() {
    assert!(StoreError::Unavailable { reason: "down".into() }.is_transient());
    assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
    assert!(!StoreError::UnknownType { type_id: 1 }.is_transient());
}

#[tokio::test]
async fn test_open_store_by_backend() {
    use crate::config::{DatabaseBackend, DatabaseSettings};

    let temp_dir = TempDir::new().unwrap();
    let settings = DatabaseSettings {
        db_directory: temp_dir.path().to_path_buf(),
        db_name: "lab_repo".to_string(),
        ..DatabaseSettings::default()
    };
    let store = open_store(&settings).await.unwrap();
    setup_case(store.as_ref()).await;
    store.close().await.unwrap();
    assert!(temp_dir.path().join("lab_repo.db").exists());

    let memory = DatabaseSettings {
        backend: DatabaseBackend::Memory,
        ..DatabaseSettings::default()
    };
    let store = open_store(&memory).await.unwrap();
    let (case, _) = setup_case(store.as_ref()).await;
    assert_eq!(store.get_case("case-2024-001").await.unwrap(), Some(case));
}

#[tokio::test]
async fn test_open_store_rejects_bad_name() {
    use crate::config::DatabaseSettings;

    let temp_dir = TempDir::new().unwrap();
    let settings = DatabaseSettings {
        db_directory: temp_dir.path().to_path_buf(),
        db_name: "Bad Name".to_string(),
        ..DatabaseSettings::default()
    };
    assert!(matches!(
        open_store(&settings).await,
        Err(crate::CorrelationError::Config(_))
    ));
}
