//! Tests for the database module

use tempfile::TempDir;

use crate::core::types::default_correlation_types;
use crate::db::bootstrap::{
    default_organization_id, insert_correlation_type, is_default_org, load_correlation_types,
    schema_version, update_schema_version, DEFAULT_ORG_NAME,
};
use crate::db::migration::{Migration, MigrationManager};
use crate::db::{
    create_database_pool, initialize_repository, verify_connection, DatabaseConfig, SchemaVersion,
    SOFTWARE_SCHEMA_VERSION,
};

async fn setup_pool() -> (sqlx::SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::with_path(temp_dir.path().join("repo.db")).with_wal(true);
    let pool = create_database_pool(&config).await.unwrap();
    (pool, temp_dir)
}

async fn table_exists(pool: &sqlx::SqlitePool, name: &str) -> bool {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await
            .unwrap();
    row.is_some()
}

#[tokio::test]
async fn test_pool_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("dir").join("repo.db");
    let pool = create_database_pool(&DatabaseConfig::with_path(db_path.clone()))
        .await
        .unwrap();

    assert!(db_path.exists());
    assert!(verify_connection(&pool, "SELECT 1").await);
}

#[tokio::test]
async fn test_verify_connection_rejects_bad_query() {
    let (pool, _dir) = setup_pool().await;
    assert!(!verify_connection(&pool, "SELECT * FROM no_such_table").await);
}

#[tokio::test]
async fn test_run_migrations_creates_instance_tables() {
    let (pool, _dir) = setup_pool().await;

    let result = MigrationManager::new(pool.clone()).run_migrations().await.unwrap();
    assert_eq!(result.applied, 2);
    assert_eq!(result.current_version, 2);

    for table in ["cases", "data_sources", "correlation_types", "db_info", "organizations"] {
        assert!(table_exists(&pool, table).await, "missing {}", table);
    }
    for correlation_type in default_correlation_types() {
        let table = correlation_type.instance_table_name();
        assert!(table_exists(&pool, &table).await, "missing {}", table);
    }
}

#[tokio::test]
async fn test_run_migrations_twice_skips_applied() {
    let (pool, _dir) = setup_pool().await;

    MigrationManager::new(pool.clone()).run_migrations().await.unwrap();
    let second = MigrationManager::new(pool.clone()).run_migrations().await.unwrap();

    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.current_version, 2);
}

#[tokio::test]
async fn test_checksum_mismatch_is_rejected() {
    let (pool, _dir) = setup_pool().await;

    let mut manager = MigrationManager::new(pool.clone());
    manager.add_migration(Migration::new(1, "first", "CREATE TABLE t1 (id INTEGER)"));
    manager.migrate().await.unwrap();

    let mut changed = MigrationManager::new(pool.clone());
    changed.add_migration(Migration::new(1, "first", "CREATE TABLE t2 (id INTEGER)"));
    assert!(changed.migrate().await.is_err());
    assert!(!table_exists(&pool, "t2").await);
}

#[tokio::test]
async fn test_failed_migration_rolls_back() {
    let (pool, _dir) = setup_pool().await;

    let mut manager = MigrationManager::new(pool.clone());
    manager.add_migration(Migration::new(
        1,
        "broken",
        "CREATE TABLE partial (id INTEGER); NOT VALID SQL",
    ));

    assert!(manager.migrate().await.is_err());
    assert!(!table_exists(&pool, "partial").await);
    assert_eq!(manager.current_version().await.unwrap(), 0);
}

#[tokio::test]
async fn test_initialize_repository_bootstrap_rows() {
    let (pool, _dir) = setup_pool().await;

    initialize_repository(&pool).await.unwrap();

    let types = load_correlation_types(&pool).await.unwrap();
    assert_eq!(types, default_correlation_types());

    assert!(default_organization_id(&pool).await.unwrap().is_some());
    assert!(is_default_org(DEFAULT_ORG_NAME));
    assert!(!is_default_org("Some Lab"));

    assert_eq!(schema_version(&pool).await.unwrap(), SOFTWARE_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_initialize_repository_is_repeatable() {
    let (pool, _dir) = setup_pool().await;

    initialize_repository(&pool).await.unwrap();
    update_schema_version(&pool, SchemaVersion { major: 1, minor: 7 })
        .await
        .unwrap();
    initialize_repository(&pool).await.unwrap();

    // Existing version rows are not reset
    assert_eq!(
        schema_version(&pool).await.unwrap(),
        SchemaVersion { major: 1, minor: 7 }
    );
    assert_eq!(load_correlation_types(&pool).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_insert_correlation_type_keeps_existing_row() {
    let (pool, _dir) = setup_pool().await;
    initialize_repository(&pool).await.unwrap();

    let mut files = default_correlation_types().remove(0);
    files.enabled = false;
    insert_correlation_type(&pool, &files).await.unwrap();

    let types = load_correlation_types(&pool).await.unwrap();
    assert!(types[0].enabled);
}

mod property_tests {
    use proptest::prelude::*;
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    use crate::db::migration::{Migration, MigrationManager};
    use crate::db::{create_database_pool, DatabaseConfig};

    fn setup_test_db() -> (sqlx::SqlitePool, TempDir, Runtime) {
        let rt = Runtime::new().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig::with_path(temp_dir.path().join("test.db"));
        let pool = rt.block_on(create_database_pool(&config)).unwrap();
        (pool, temp_dir, rt)
    }

    fn table_name_strategy() -> impl Strategy<Value = String> {
        "t_[a-z0-9_]{2,12}".prop_map(|s| s.to_string())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(25))]

        /// A migration either applies completely and is recorded, or leaves
        /// no trace.
        #[test]
        fn prop_migration_atomicity(
            table1 in table_name_strategy(),
            table2 in table_name_strategy(),
            fail_second in prop::bool::ANY,
        ) {
            prop_assume!(table1 != table2);
            let (pool, _temp_dir, rt) = setup_test_db();

            rt.block_on(async {
                let second = if fail_second {
                    "INVALID SQL SYNTAX HERE".to_string()
                } else {
                    format!("CREATE TABLE {} (id INTEGER PRIMARY KEY)", table2)
                };
                let sql = format!("CREATE TABLE {} (id INTEGER PRIMARY KEY); {}", table1, second);

                let mut manager = MigrationManager::new(pool.clone());
                manager.add_migration(Migration::new(1, "multi_statement", &sql));
                let result = manager.migrate().await;

                let first_exists: Option<(String,)> =
                    sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
                        .bind(&table1)
                        .fetch_optional(&pool)
                        .await
                        .unwrap();

                if fail_second {
                    prop_assert!(result.is_err());
                    prop_assert!(first_exists.is_none());
                    prop_assert_eq!(manager.current_version().await.unwrap(), 0);
                } else {
                    prop_assert!(result.is_ok());
                    prop_assert!(first_exists.is_some());
                    prop_assert_eq!(manager.current_version().await.unwrap(), 1);
                }
                Ok(())
            })?;
        }
    }
}
