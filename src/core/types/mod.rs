//! Core data types
//!
//! This module defines the data structures shared by the store, the tag
//! index, the policy and the sync engine.

pub mod case;
pub mod correlation;
pub mod known;
pub mod tag;

// Re-export commonly used types
pub use case::{
    ArtifactAttribute, ArtifactInfo, ArtifactType, AttributeKind, CaseInfo, CorrelationCase,
    CorrelationDataSource, DataSourceInfo, FileInfo,
};
pub use correlation::{
    default_correlation_type, default_correlation_types, CorrelationAttribute,
    CorrelationAttributeInstance, CorrelationType, InstanceKey,
};
pub use known::KnownStatus;
pub use tag::{Tag, TagName, TaggedObject};
