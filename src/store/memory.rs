//! In-memory correlation store

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::{CommentUpdate, CorrelationStore, StoreError, StoreResult};
use crate::core::types::{
    default_correlation_types, CaseInfo, CorrelationAttributeInstance, CorrelationCase,
    CorrelationDataSource, CorrelationType, DataSourceInfo, InstanceKey, KnownStatus,
};

/// Process-local correlation store
///
/// Shares the upsert semantics of the SQLite store. Nothing survives the
/// process.
pub struct MemoryCorrelationStore {
    instances: DashMap<InstanceKey, CorrelationAttributeInstance>,
    cases: DashMap<String, CorrelationCase>,
    /// Keyed by (case id, data source object id)
    data_sources: DashMap<(i64, i64), CorrelationDataSource>,
    types: RwLock<HashMap<i32, CorrelationType>>,
    next_case_id: AtomicI64,
    next_data_source_id: AtomicI64,
}

impl Default for MemoryCorrelationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCorrelationStore {
    /// Create an empty store with the default correlation types
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
            cases: DashMap::new(),
            data_sources: DashMap::new(),
            types: RwLock::new(
                default_correlation_types()
                    .into_iter()
                    .map(|t| (t.id, t))
                    .collect(),
            ),
            next_case_id: AtomicI64::new(1),
            next_data_source_id: AtomicI64::new(1),
        }
    }

    /// Enable or disable a correlation type
    pub fn set_type_enabled(&self, type_id: i32, enabled: bool) -> StoreResult<()> {
        let mut types = self.types.write();
        let correlation_type = types
            .get_mut(&type_id)
            .ok_or(StoreError::UnknownType { type_id })?;
        correlation_type.enabled = enabled;
        Ok(())
    }

    /// Snapshot of every stored instance, ordered by key
    pub fn instances(&self) -> Vec<CorrelationAttributeInstance> {
        let mut all: Vec<_> = self.instances.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn check_type(&self, type_id: i32) -> StoreResult<()> {
        let types = self.types.read();
        let correlation_type = types
            .get(&type_id)
            .ok_or(StoreError::UnknownType { type_id })?;
        if !correlation_type.is_usable() {
            return Err(StoreError::TypeDisabled { type_id });
        }
        Ok(())
    }
}

#[async_trait]
impl CorrelationStore for MemoryCorrelationStore {
    async fn find(&self, key: &InstanceKey) -> StoreResult<Option<CorrelationAttributeInstance>> {
        self.check_type(key.type_id)?;
        Ok(self.instances.get(key).map(|e| e.value().clone()))
    }

    async fn upsert_known_status(
        &self,
        key: &InstanceKey,
        status: KnownStatus,
        comment: &CommentUpdate,
        object_id: Option<i64>,
    ) -> StoreResult<()> {
        self.check_type(key.type_id)?;

        self.instances
            .entry(key.clone())
            .and_modify(|instance| {
                instance.known_status = status;
                instance.comment = comment.apply(instance.comment.as_deref());
                if object_id.is_some() {
                    instance.object_id = object_id;
                }
            })
            .or_insert_with(|| CorrelationAttributeInstance {
                key: key.clone(),
                known_status: status,
                comment: comment.apply(None),
                object_id,
            });
        Ok(())
    }

    async fn get_case(&self, case_name: &str) -> StoreResult<Option<CorrelationCase>> {
        Ok(self.cases.get(case_name).map(|e| e.value().clone()))
    }

    async fn new_case(&self, case: &CaseInfo) -> StoreResult<CorrelationCase> {
        let entry = self.cases.entry(case.name.clone()).or_insert_with(|| CorrelationCase {
            id: self.next_case_id.fetch_add(1, Ordering::SeqCst),
            case_uid: case.name.clone(),
            display_name: case.display_name.clone(),
            created_at: Utc::now(),
        });
        Ok(entry.value().clone())
    }

    async fn get_data_source(
        &self,
        case_id: i64,
        object_id: i64,
    ) -> StoreResult<Option<CorrelationDataSource>> {
        Ok(self
            .data_sources
            .get(&(case_id, object_id))
            .map(|e| e.value().clone()))
    }

    async fn new_data_source(
        &self,
        case_id: i64,
        data_source: &DataSourceInfo,
    ) -> StoreResult<CorrelationDataSource> {
        if !self.cases.iter().any(|e| e.value().id == case_id) {
            return Err(StoreError::CaseNotFound { case_id });
        }

        let entry = self
            .data_sources
            .entry((case_id, data_source.object_id))
            .or_insert_with(|| CorrelationDataSource {
                id: self.next_data_source_id.fetch_add(1, Ordering::SeqCst),
                case_id,
                device_id: data_source.device_id.clone(),
                name: data_source.name.clone(),
                object_id: data_source.object_id,
            });
        Ok(entry.value().clone())
    }

    async fn update_data_source_name(&self, data_source_id: i64, name: &str) -> StoreResult<()> {
        let mut updated = false;
        for mut entry in self.data_sources.iter_mut() {
            if entry.value().id == data_source_id {
                entry.value_mut().name = name.to_string();
                updated = true;
            }
        }
        if !updated {
            return Err(StoreError::DataSourceNotFound { data_source_id });
        }
        Ok(())
    }
}
