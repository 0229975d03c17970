//! Database migration manager
//!
//! Versioned, checksummed schema migrations. Each migration runs inside a
//! transaction so a failing statement leaves the schema untouched.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::core::error::{CorrelationError, DatabaseError, Result};
use crate::core::types::default_correlation_types;

/// Represents a single database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number
    pub version: i64,
    /// Migration name
    pub name: String,
    /// SQL statements to apply the migration
    pub up_sql: String,
    /// Checksum for integrity verification
    pub checksum: String,
}

impl Migration {
    /// Create a new migration
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = Self::calculate_checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }

    /// Calculate checksum for migration content
    fn calculate_checksum(content: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

/// SQL creating one `<type>_instances` table per default correlation type
pub fn instance_tables_sql() -> String {
    let mut sql = String::new();
    for correlation_type in default_correlation_types() {
        let table = correlation_type.instance_table_name();
        sql.push_str(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                case_id INTEGER NOT NULL,
                data_source_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                file_path TEXT NOT NULL,
                known_status INTEGER NOT NULL,
                comment TEXT,
                file_obj_id INTEGER,
                CONSTRAINT {table}_multi_unique UNIQUE (data_source_id, value, file_path),
                FOREIGN KEY (case_id) REFERENCES cases(id) ON UPDATE SET NULL ON DELETE SET NULL,
                FOREIGN KEY (data_source_id) REFERENCES data_sources(id) ON UPDATE SET NULL ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS {table}_case_id ON {table} (case_id);
            CREATE INDEX IF NOT EXISTS {table}_value ON {table} (value);
            CREATE INDEX IF NOT EXISTS {table}_value_known_status ON {table} (value, known_status);
            "#
        ));
    }
    sql
}

/// Migration manager for handling database schema updates
pub struct MigrationManager {
    pool: SqlitePool,
    migrations: Vec<Migration>,
}

impl MigrationManager {
    /// Create a new migration manager
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            migrations: Vec::new(),
        }
    }

    /// Add a migration to the manager
    pub fn add_migration(&mut self, migration: Migration) {
        self.migrations.push(migration);
        self.migrations.sort_by_key(|m| m.version);
    }

    /// Load the repository schema migrations
    pub fn with_embedded_migrations(mut self) -> Self {
        self.add_migration(Migration::new(
            1,
            "001_initial_schema",
            include_str!("../../migrations/001_initial_schema.sql"),
        ));
        self.add_migration(Migration::new(2, "002_instance_tables", instance_tables_sql()));
        self
    }

    /// Apply the embedded repository migrations
    pub async fn run_migrations(self) -> Result<MigrationResult> {
        self.with_embedded_migrations().migrate().await
    }

    /// Ensure the migrations table exists
    async fn ensure_migrations_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL,
                checksum TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(CorrelationError::Database)?;

        Ok(())
    }

    /// Get the current schema version
    pub async fn current_version(&self) -> Result<i64> {
        self.ensure_migrations_table().await?;

        let result: (Option<i64>,) = sqlx::query_as("SELECT MAX(version) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(CorrelationError::Database)?;

        Ok(result.0.unwrap_or(0))
    }

    /// Get applied migrations keyed by version
    pub async fn applied_migrations(&self) -> Result<HashMap<i64, AppliedMigration>> {
        self.ensure_migrations_table().await?;

        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT version, name, applied_at, checksum FROM schema_migrations ORDER BY version",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(CorrelationError::Database)?;

        Ok(rows
            .into_iter()
            .map(|(version, name, applied_at, checksum)| {
                (
                    version,
                    AppliedMigration {
                        version,
                        name,
                        applied_at,
                        checksum,
                    },
                )
            })
            .collect())
    }

    /// Run all pending migrations in version order
    pub async fn migrate(&self) -> Result<MigrationResult> {
        self.ensure_migrations_table().await?;

        let applied = self.applied_migrations().await?;
        let mut result = MigrationResult::default();

        for migration in &self.migrations {
            if let Some(applied_migration) = applied.get(&migration.version) {
                if applied_migration.checksum != migration.checksum {
                    return Err(CorrelationError::DatabaseInternal(
                        DatabaseError::MigrationFailed {
                            reason: format!(
                                "Migration {} checksum mismatch: expected {}, found {}",
                                migration.version, migration.checksum, applied_migration.checksum
                            ),
                        },
                    ));
                }
                result.skipped += 1;
                continue;
            }

            self.apply_migration(migration).await?;
            result.applied += 1;
            result.applied_versions.push(migration.version);
        }

        result.current_version = self.current_version().await?;
        Ok(result)
    }

    /// Apply a single migration atomically
    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        tracing::info!(
            version = migration.version,
            name = %migration.name,
            "Applying migration"
        );

        let mut tx = self.pool.begin().await.map_err(CorrelationError::Database)?;

        for statement in migration.up_sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() || is_comment_only(statement) {
                continue;
            }

            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    CorrelationError::DatabaseInternal(DatabaseError::MigrationFailed {
                        reason: format!(
                            "Migration {} failed at statement: {}. Error: {}",
                            migration.version, statement, e
                        ),
                    })
                })?;
        }

        sqlx::query(
            r#"
            INSERT INTO schema_migrations (version, name, applied_at, checksum)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(migration.version)
        .bind(&migration.name)
        .bind(Utc::now().to_rfc3339())
        .bind(&migration.checksum)
        .execute(&mut *tx)
        .await
        .map_err(CorrelationError::Database)?;

        tx.commit().await.map_err(CorrelationError::Database)?;

        tracing::info!(version = migration.version, "Migration applied");
        Ok(())
    }
}

fn is_comment_only(statement: &str) -> bool {
    statement
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .all(|l| l.starts_with("--"))
}

/// Information about an applied migration
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub applied_at: String,
    pub checksum: String,
}

/// Result of running migrations
#[derive(Debug, Default)]
pub struct MigrationResult {
    /// Number of migrations applied
    pub applied: usize,
    /// Number of migrations skipped (already applied)
    pub skipped: usize,
    /// Versions that were applied
    pub applied_versions: Vec<i64>,
    /// Current schema version after migration
    pub current_version: i64,
}
