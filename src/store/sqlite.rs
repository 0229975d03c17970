//! SQLite correlation store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use super::{CommentUpdate, CorrelationStore, StoreError, StoreResult};
use crate::core::error::Result;
use crate::core::types::{
    CaseInfo, CorrelationAttributeInstance, CorrelationCase, CorrelationDataSource,
    CorrelationType, DataSourceInfo, InstanceKey, KnownStatus,
};
use crate::db::bootstrap::{load_correlation_types, DEFAULT_ORG_NAME};
use crate::db::{create_database_pool, full_checkpoint, initialize_repository, DatabaseConfig};

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid table name regex");
}

/// Correlation store backed by the SQLite repository database
pub struct SqliteCorrelationStore {
    pool: SqlitePool,
    types: RwLock<HashMap<i32, CorrelationType>>,
}

impl SqliteCorrelationStore {
    /// Open (and initialize if needed) the repository at the configured path
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let pool = create_database_pool(config).await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running migrations and bootstrap first
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        initialize_repository(&pool).await?;
        let store = Self {
            pool,
            types: RwLock::new(HashMap::new()),
        };
        store.reload_types().await?;
        Ok(store)
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Refresh the cached correlation type definitions
    pub async fn reload_types(&self) -> Result<()> {
        let loaded = load_correlation_types(&self.pool).await?;
        let mut types = HashMap::with_capacity(loaded.len());
        for correlation_type in loaded {
            if !TABLE_NAME.is_match(&correlation_type.db_table_name) {
                warn!(
                    type_id = correlation_type.id,
                    table = %correlation_type.db_table_name,
                    "Ignoring correlation type with invalid table name"
                );
                continue;
            }
            types.insert(correlation_type.id, correlation_type);
        }
        info!(count = types.len(), "Correlation types loaded");
        *self.types.write() = types;
        Ok(())
    }

    /// Enable or disable a correlation type
    pub async fn set_type_enabled(&self, type_id: i32, enabled: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE correlation_types SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(type_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownType { type_id });
        }
        if let Some(correlation_type) = self.types.write().get_mut(&type_id) {
            correlation_type.enabled = enabled;
        }
        Ok(())
    }

    /// Instance table of a usable correlation type
    fn instance_table(&self, type_id: i32) -> StoreResult<String> {
        let types = self.types.read();
        let correlation_type = types
            .get(&type_id)
            .ok_or(StoreError::UnknownType { type_id })?;
        if !correlation_type.is_usable() {
            return Err(StoreError::TypeDisabled { type_id });
        }
        Ok(correlation_type.instance_table_name())
    }

    async fn case_exists(&self, case_id: i64) -> StoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM cases WHERE id = ?")
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

fn case_from_row(row: &SqliteRow) -> StoreResult<CorrelationCase> {
    let created: String = row.try_get("creation_date")?;
    let created_at = DateTime::parse_from_rfc3339(&created)
        .map_err(|e| StoreError::Corrupt {
            table: "cases".to_string(),
            reason: format!("bad creation_date {}: {}", created, e),
        })?
        .with_timezone(&Utc);

    Ok(CorrelationCase {
        id: row.try_get("id")?,
        case_uid: row.try_get("case_uid")?,
        display_name: row.try_get("case_name")?,
        created_at,
    })
}

fn data_source_from_row(row: &SqliteRow) -> StoreResult<CorrelationDataSource> {
    Ok(CorrelationDataSource {
        id: row.try_get("id")?,
        case_id: row.try_get("case_id")?,
        device_id: row.try_get("device_id")?,
        name: row.try_get("name")?,
        object_id: row.try_get("datasource_obj_id")?,
    })
}

#[async_trait]
impl CorrelationStore for SqliteCorrelationStore {
    async fn find(&self, key: &InstanceKey) -> StoreResult<Option<CorrelationAttributeInstance>> {
        let table = self.instance_table(key.type_id)?;
        let sql = format!(
            "SELECT known_status, comment, file_obj_id FROM {} \
             WHERE case_id = ? AND data_source_id = ? AND value = ? AND file_path = ?",
            table
        );

        let row = sqlx::query(&sql)
            .bind(key.case_id)
            .bind(key.data_source_id)
            .bind(&key.value)
            .bind(&key.file_path)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_status: i64 = row.try_get("known_status")?;
        let known_status = KnownStatus::from_db_value(raw_status).ok_or_else(|| StoreError::Corrupt {
            table: table.clone(),
            reason: format!("unknown known_status {}", raw_status),
        })?;

        Ok(Some(CorrelationAttributeInstance {
            key: key.clone(),
            known_status,
            comment: row.try_get("comment")?,
            object_id: row.try_get("file_obj_id")?,
        }))
    }

    async fn upsert_known_status(
        &self,
        key: &InstanceKey,
        status: KnownStatus,
        comment: &CommentUpdate,
        object_id: Option<i64>,
    ) -> StoreResult<()> {
        let table = self.instance_table(key.type_id)?;
        let comment_assignment = match comment {
            CommentUpdate::Keep => "",
            CommentUpdate::Set(_) | CommentUpdate::Clear => ", comment = excluded.comment",
        };
        let sql = format!(
            "INSERT INTO {table} (case_id, data_source_id, value, file_path, known_status, comment, file_obj_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (data_source_id, value, file_path) DO UPDATE SET \
             known_status = excluded.known_status, \
             file_obj_id = COALESCE(excluded.file_obj_id, file_obj_id){comment_assignment}"
        );

        let stored_comment = match comment {
            CommentUpdate::Set(c) => Some(c.as_str()),
            CommentUpdate::Keep | CommentUpdate::Clear => None,
        };

        sqlx::query(&sql)
            .bind(key.case_id)
            .bind(key.data_source_id)
            .bind(&key.value)
            .bind(&key.file_path)
            .bind(status.as_db_value())
            .bind(stored_comment)
            .bind(object_id)
            .execute(&self.pool)
            .await?;

        debug!(instance = %key, status = %status, "Known status written");
        Ok(())
    }

    async fn get_case(&self, case_name: &str) -> StoreResult<Option<CorrelationCase>> {
        let row = sqlx::query("SELECT id, case_uid, case_name, creation_date FROM cases WHERE case_uid = ?")
            .bind(case_name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(case_from_row).transpose()
    }

    async fn new_case(&self, case: &CaseInfo) -> StoreResult<CorrelationCase> {
        sqlx::query(
            r#"
            INSERT INTO cases (case_uid, org_id, case_name, creation_date, examiner_name, notes)
            VALUES (?, (SELECT id FROM organizations WHERE org_name = ?), ?, ?, ?, ?)
            ON CONFLICT (case_uid) DO NOTHING
            "#,
        )
        .bind(&case.name)
        .bind(DEFAULT_ORG_NAME)
        .bind(&case.display_name)
        .bind(Utc::now().to_rfc3339())
        .bind(&case.examiner)
        .bind(&case.notes)
        .execute(&self.pool)
        .await?;

        self.get_case(&case.name).await?.ok_or_else(|| StoreError::Corrupt {
            table: "cases".to_string(),
            reason: format!("case {} missing after insert", case.name),
        })
    }

    async fn get_data_source(
        &self,
        case_id: i64,
        object_id: i64,
    ) -> StoreResult<Option<CorrelationDataSource>> {
        let row = sqlx::query(
            "SELECT id, case_id, device_id, name, datasource_obj_id FROM data_sources \
             WHERE case_id = ? AND datasource_obj_id = ?",
        )
        .bind(case_id)
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(data_source_from_row).transpose()
    }

    async fn new_data_source(
        &self,
        case_id: i64,
        data_source: &DataSourceInfo,
    ) -> StoreResult<CorrelationDataSource> {
        if !self.case_exists(case_id).await? {
            return Err(StoreError::CaseNotFound { case_id });
        }

        sqlx::query(
            r#"
            INSERT INTO data_sources (case_id, device_id, name, datasource_obj_id, md5)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (case_id, datasource_obj_id) DO NOTHING
            "#,
        )
        .bind(case_id)
        .bind(&data_source.device_id)
        .bind(&data_source.name)
        .bind(data_source.object_id)
        .bind(&data_source.md5)
        .execute(&self.pool)
        .await?;

        self.get_data_source(case_id, data_source.object_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                table: "data_sources".to_string(),
                reason: format!("data source {} missing after insert", data_source.object_id),
            })
    }

    async fn update_data_source_name(&self, data_source_id: i64, name: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE data_sources SET name = ? WHERE id = ?")
            .bind(name)
            .bind(data_source_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::DataSourceNotFound { data_source_id });
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        if let Err(e) = full_checkpoint(&self.pool).await {
            warn!(error = %e, "Checkpoint on close failed");
        }
        self.pool.close().await;
        info!("Correlation store closed");
        Ok(())
    }
}
