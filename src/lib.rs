//! correlation-sync - notable-status propagation for a forensic correlation repository
//!
//! This crate keeps the known status of correlation attribute instances in
//! step with the tags examiners apply inside a case:
//! - Tag events routed to a single FIFO worker
//! - A notability policy deciding status and comment per instance
//! - Bulk re-evaluation when a tag definition changes
//! - SQLite repository with versioned migrations, or an in-memory store
//! - JSON configuration with a repository enabled switch

pub mod config;
pub mod content;
pub mod core;
pub mod db;
pub mod events;
pub mod extract;
pub mod logging;
pub mod policy;
pub mod service;
pub mod store;
pub mod sync;
pub mod tag;

// Re-export commonly used items
pub use config::{CentralRepoConfig, ConfigStore};
pub use core::error::{CorrelationError, Result};
pub use db::{create_database_pool, DatabaseConfig};
pub use events::{CaseEvent, EventRouter, ShutdownMode};
pub use policy::NotabilityPolicy;
pub use service::CorrelationService;
pub use store::{open_store, CorrelationStore, MemoryCorrelationStore, SqliteCorrelationStore};
pub use sync::CorrelationSyncEngine;
