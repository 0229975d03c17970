//! Core module
//!
//! Error types and the data types shared across the crate.

pub mod error;
pub mod types;

// Re-export commonly used items
pub use error::{CaseDataError, CorrelationError, DatabaseError, Result};
pub use types::*;
