//! Correlation store error types

use thiserror::Error;

/// Correlation store specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown correlation type: {type_id}")]
    UnknownType { type_id: i32 },

    #[error("Correlation type {type_id} is disabled")]
    TypeDisabled { type_id: i32 },

    #[error("Case not found: {case_id}")]
    CaseNotFound { case_id: i64 },

    #[error("Data source not found: {data_source_id}")]
    DataSourceNotFound { data_source_id: i64 },

    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: String, reason: String },

    #[error("Correlation store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Whether the operation may succeed if attempted again later
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ) || is_busy(e),
            StoreError::Unavailable { .. } => true,
            _ => false,
        }
    }
}

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            message.contains("database is locked") || message.contains("database is busy")
        }
        _ => false,
    }
}
