//! Repository bootstrap
//!
//! Rows every correlation repository needs before the first case is
//! recorded: the correlation types, the default organization and the
//! schema version in `db_info`.

use sqlx::{Row, SqlitePool};

use crate::core::error::{CorrelationError, DatabaseError, Result};
use crate::core::types::{default_correlation_types, CorrelationType};

use super::migration::MigrationManager;

/// Organization assigned to cases created without one
pub const DEFAULT_ORG_NAME: &str = "Not Specified";

const SCHEMA_MAJOR_VERSION_KEY: &str = "SCHEMA_VERSION";
const SCHEMA_MINOR_VERSION_KEY: &str = "SCHEMA_MINOR_VERSION";
const CREATION_SCHEMA_MAJOR_VERSION_KEY: &str = "CREATION_SCHEMA_MAJOR_VERSION";
const CREATION_SCHEMA_MINOR_VERSION_KEY: &str = "CREATION_SCHEMA_MINOR_VERSION";

/// Repository schema version recorded in `db_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: i32,
    pub minor: i32,
}

/// Schema version written by this crate
pub const SOFTWARE_SCHEMA_VERSION: SchemaVersion = SchemaVersion { major: 1, minor: 6 };

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Migrate the schema and insert the bootstrap rows
///
/// Safe to call on an already initialized repository.
pub async fn initialize_repository(pool: &SqlitePool) -> Result<()> {
    let result = MigrationManager::new(pool.clone()).run_migrations().await?;
    tracing::debug!(
        applied = result.applied,
        version = result.current_version,
        "Repository schema ready"
    );

    insert_default_correlation_types(pool).await?;
    insert_default_organization(pool).await?;
    if !schema_version_is_set(pool).await? {
        update_schema_version(pool, SOFTWARE_SCHEMA_VERSION).await?;
        insert_creation_schema_version(pool, SOFTWARE_SCHEMA_VERSION).await?;
    }
    Ok(())
}

/// Insert the default correlation types; existing rows are left alone
pub async fn insert_default_correlation_types(pool: &SqlitePool) -> Result<()> {
    for correlation_type in default_correlation_types() {
        insert_correlation_type(pool, &correlation_type).await?;
    }
    Ok(())
}

/// Insert one correlation type unless its id is already present
pub async fn insert_correlation_type(pool: &SqlitePool, correlation_type: &CorrelationType) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO correlation_types (id, display_name, db_table_name, supported, enabled)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(correlation_type.id)
    .bind(&correlation_type.display_name)
    .bind(&correlation_type.db_table_name)
    .bind(correlation_type.supported)
    .bind(correlation_type.enabled)
    .execute(pool)
    .await
    .map_err(CorrelationError::Database)?;
    Ok(())
}

/// Load every correlation type ordered by id
pub async fn load_correlation_types(pool: &SqlitePool) -> Result<Vec<CorrelationType>> {
    let rows = sqlx::query(
        "SELECT id, display_name, db_table_name, supported, enabled FROM correlation_types ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(CorrelationError::Database)?;

    rows.iter()
        .map(|row| {
            Ok(CorrelationType {
                id: row.try_get("id")?,
                display_name: row.try_get("display_name")?,
                db_table_name: row.try_get("db_table_name")?,
                supported: row.try_get("supported")?,
                enabled: row.try_get("enabled")?,
            })
        })
        .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
        .map_err(CorrelationError::Database)
}

/// Insert the default organization when missing
pub async fn insert_default_organization(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO organizations (org_name, poc_name, poc_email, poc_phone)
        VALUES (?, '', '', '')
        "#,
    )
    .bind(DEFAULT_ORG_NAME)
    .execute(pool)
    .await
    .map_err(CorrelationError::Database)?;
    Ok(())
}

/// Id of the default organization
pub async fn default_organization_id(pool: &SqlitePool) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM organizations WHERE org_name = ?")
        .bind(DEFAULT_ORG_NAME)
        .fetch_optional(pool)
        .await
        .map_err(CorrelationError::Database)?;
    Ok(id)
}

pub fn is_default_org(org_name: &str) -> bool {
    org_name == DEFAULT_ORG_NAME
}

/// Whether the schema version rows exist
pub async fn schema_version_is_set(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM db_info WHERE name = ?")
        .bind(SCHEMA_MAJOR_VERSION_KEY)
        .fetch_one(pool)
        .await
        .map_err(CorrelationError::Database)?;
    Ok(count > 0)
}

/// Read the current schema version
pub async fn schema_version(pool: &SqlitePool) -> Result<SchemaVersion> {
    let major = read_db_info_int(pool, SCHEMA_MAJOR_VERSION_KEY).await?;
    let minor = read_db_info_int(pool, SCHEMA_MINOR_VERSION_KEY).await?;
    Ok(SchemaVersion { major, minor })
}

/// Record the current schema version
pub async fn update_schema_version(pool: &SqlitePool, version: SchemaVersion) -> Result<()> {
    upsert_db_info(pool, SCHEMA_MAJOR_VERSION_KEY, &version.major.to_string()).await?;
    upsert_db_info(pool, SCHEMA_MINOR_VERSION_KEY, &version.minor.to_string()).await?;
    Ok(())
}

async fn insert_creation_schema_version(pool: &SqlitePool, version: SchemaVersion) -> Result<()> {
    upsert_db_info(pool, CREATION_SCHEMA_MAJOR_VERSION_KEY, &version.major.to_string()).await?;
    upsert_db_info(pool, CREATION_SCHEMA_MINOR_VERSION_KEY, &version.minor.to_string()).await?;
    Ok(())
}

async fn upsert_db_info(pool: &SqlitePool, name: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO db_info (name, value) VALUES (?, ?)
        ON CONFLICT(name) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(name)
    .bind(value)
    .execute(pool)
    .await
    .map_err(CorrelationError::Database)?;
    Ok(())
}

async fn read_db_info_int(pool: &SqlitePool, name: &str) -> Result<i32> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM db_info WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .map_err(CorrelationError::Database)?;

    let value = value.ok_or_else(|| DatabaseError::SchemaInvalid {
        reason: format!("db_info is missing {}", name),
    })?;

    value.trim().parse::<i32>().map_err(|_| {
        DatabaseError::SchemaInvalid {
            reason: format!("db_info {} is not a number: {}", name, value),
        }
        .into()
    })
}
