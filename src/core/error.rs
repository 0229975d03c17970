//! Error types for correlation-sync
//!
//! Module-level errors live next to their modules; this file holds the
//! crate-wide aggregate and the errors shared by several modules.

use thiserror::Error;

use crate::config::ConfigError;
use crate::events::RouterError;
use crate::logging::LoggingError;
use crate::store::StoreError;
use crate::sync::SyncError;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, CorrelationError>;

/// Main error type
#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Case data error: {0}")]
    CaseData(#[from] CaseDataError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database internal error: {0}")]
    DatabaseInternal(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the case-side collaborators (tag index, content lookup)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseDataError {
    #[error("No case is open")]
    NoOpenCase,

    #[error("Lookup of {what} failed: {reason}")]
    LookupFailed { what: String, reason: String },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Migration failed: {reason}")]
    MigrationFailed { reason: String },

    #[error("Schema check failed: {reason}")]
    SchemaInvalid { reason: String },
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => DatabaseError::QueryFailed {
                reason: db_err.to_string(),
            },
            sqlx::Error::PoolTimedOut => DatabaseError::ConnectionFailed {
                reason: "Pool timed out".to_string(),
            },
            sqlx::Error::PoolClosed => DatabaseError::ConnectionFailed {
                reason: "Pool closed".to_string(),
            },
            _ => DatabaseError::QueryFailed {
                reason: err.to_string(),
            },
        }
    }
}

impl CorrelationError {
    /// Whether the operation may succeed if attempted again later
    pub fn is_transient(&self) -> bool {
        match self {
            CorrelationError::Store(e) => e.is_transient(),
            CorrelationError::Database(sqlx::Error::PoolTimedOut) => true,
            CorrelationError::DatabaseInternal(DatabaseError::ConnectionFailed { .. }) => true,
            _ => false,
        }
    }
}
