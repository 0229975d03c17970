//! Sync engine error types

use thiserror::Error;

use crate::core::error::CaseDataError;
use crate::store::StoreError;

/// Result type for sync operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Errors raised while synchronizing an object with the repository
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The object disappeared from the case; benign
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Case data lookup failed: {0}")]
    Lookup(#[from] CaseDataError),
}

impl SyncError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        SyncError::NotFound { what: what.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}
