use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::{CaseContent, ContentResult};
use crate::core::error::CaseDataError;
use crate::core::types::{ArtifactInfo, CaseInfo, DataSourceInfo, FileInfo};

/// Case content held in process memory
#[derive(Debug)]
pub struct InMemoryCaseContent {
    case: RwLock<Option<CaseInfo>>,
    files: DashMap<i64, FileInfo>,
    artifacts: DashMap<i64, ArtifactInfo>,
    data_sources: DashMap<i64, DataSourceInfo>,
}

impl InMemoryCaseContent {
    /// Create content for an open case
    pub fn new(case: CaseInfo) -> Self {
        Self {
            case: RwLock::new(Some(case)),
            files: DashMap::new(),
            artifacts: DashMap::new(),
            data_sources: DashMap::new(),
        }
    }

    pub fn add_file(&self, file: FileInfo) {
        self.files.insert(file.object_id, file);
    }

    pub fn add_artifact(&self, artifact: ArtifactInfo) {
        self.artifacts.insert(artifact.artifact_id, artifact);
    }

    pub fn add_data_source(&self, data_source: DataSourceInfo) {
        self.data_sources.insert(data_source.object_id, data_source);
    }

    /// Close the case; later lookups fail with `NoOpenCase`
    pub fn close_case(&self) {
        *self.case.write() = None;
    }

    fn ensure_open(&self) -> ContentResult<()> {
        if self.case.read().is_none() {
            return Err(CaseDataError::NoOpenCase);
        }
        Ok(())
    }
}

#[async_trait]
impl CaseContent for InMemoryCaseContent {
    async fn case_info(&self) -> ContentResult<CaseInfo> {
        self.case.read().clone().ok_or(CaseDataError::NoOpenCase)
    }

    async fn file(&self, content_id: i64) -> ContentResult<Option<FileInfo>> {
        self.ensure_open()?;
        Ok(self.files.get(&content_id).map(|e| e.value().clone()))
    }

    async fn artifact(&self, artifact_id: i64) -> ContentResult<Option<ArtifactInfo>> {
        self.ensure_open()?;
        Ok(self.artifacts.get(&artifact_id).map(|e| e.value().clone()))
    }

    async fn data_source(&self, object_id: i64) -> ContentResult<Option<DataSourceInfo>> {
        self.ensure_open()?;
        Ok(self.data_sources.get(&object_id).map(|e| e.value().clone()))
    }
}
