//! Correlation sync engine
//!
//! Applies notability decisions to the correlation repository. For one
//! object the engine resolves the file or artifact, derives its correlation
//! attributes, resolves the case and data source records, reads every
//! instance for its stored comment, asks for a decision and upserts it.
//!
//! Instance writes are independent: a failed write is recorded in the
//! [`SyncReport`] and its siblings are kept.

mod error;


use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use crate::content::CaseContent;
use crate::core::types::{
    CaseInfo, CorrelationAttribute, CorrelationCase, CorrelationDataSource, DataSourceInfo,
    InstanceKey, KnownStatus, Tag, TagName, TaggedObject,
};
use crate::extract::{AttributeExtractor, DefaultAttributeExtractor};
use crate::policy::{Decision, DefinitionDecision, NotabilityPolicy, TagChange};
use crate::store::{CorrelationStore, StoreError};
use crate::tag::TagIndex;

pub use error::{SyncError, SyncResult};

/// A failed instance write
#[derive(Debug)]
pub struct InstanceFailure {
    pub key: InstanceKey,
    pub error: StoreError,
}

/// What happened to the instances of one object
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Correlation instances derived from the object
    pub instances: usize,
    /// Instances written
    pub written: usize,
    /// Instances left alone because the decision had nothing to write
    pub unchanged: usize,
    /// Instances left alone because they are known
    pub skipped_known: usize,
    /// The object itself is a known file (or an artifact of one)
    pub known_object: bool,
    pub failures: Vec<InstanceFailure>,
}

impl SyncReport {
    fn known_object() -> Self {
        Self {
            known_object: true,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of re-evaluating one object during a bulk resync
#[derive(Debug)]
pub enum ResyncOutcome {
    Synced {
        object: TaggedObject,
        report: SyncReport,
    },
    /// Demotion skipped because another notable tag still applies
    ConflictSkipped { object: TaggedObject },
}

impl ResyncOutcome {
    pub fn object(&self) -> TaggedObject {
        match self {
            ResyncOutcome::Synced { object, .. } | ResyncOutcome::ConflictSkipped { object } => *object,
        }
    }
}

/// Writes notability decisions to the correlation store
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct CorrelationSyncEngine {
    store: Arc<dyn CorrelationStore>,
    tags: Arc<dyn TagIndex>,
    content: Arc<dyn CaseContent>,
    extractor: Arc<dyn AttributeExtractor>,
}

impl CorrelationSyncEngine {
    /// Create an engine using the default attribute extraction rules
    pub fn new(
        store: Arc<dyn CorrelationStore>,
        tags: Arc<dyn TagIndex>,
        content: Arc<dyn CaseContent>,
    ) -> Self {
        Self {
            store,
            tags,
            content,
            extractor: Arc::new(DefaultAttributeExtractor::new()),
        }
    }

    /// Replace the attribute extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn AttributeExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &Arc<dyn CorrelationStore> {
        &self.store
    }

    pub fn tags(&self) -> &Arc<dyn TagIndex> {
        &self.tags
    }

    /// Synchronize every correlation instance of an object
    ///
    /// `decide` receives the stored comment of each instance (`None` when
    /// the instance does not exist yet) and returns what to write. Stored
    /// instances that are known are never handed to `decide`.
    pub async fn sync_object<F>(&self, object: TaggedObject, mut decide: F) -> SyncResult<SyncReport>
    where
        F: FnMut(Option<&str>) -> Decision + Send,
    {
        let attributes = match self.derive_attributes(object).await? {
            Some(attributes) => attributes,
            None => {
                debug!(%object, "Object is known, leaving its instances alone");
                return Ok(SyncReport::known_object());
            }
        };

        let mut report = SyncReport {
            instances: attributes.len(),
            ..Default::default()
        };
        if attributes.is_empty() {
            return Ok(report);
        }

        let case = self.resolve_case().await?;
        let mut data_sources: HashMap<i64, CorrelationDataSource> = HashMap::new();

        for attribute in attributes {
            let data_source_id = match data_sources.get(&attribute.data_source_object_id) {
                Some(ds) => ds.id,
                None => {
                    let ds = self
                        .resolve_data_source(&case, attribute.data_source_object_id)
                        .await?;
                    let id = ds.id;
                    data_sources.insert(attribute.data_source_object_id, ds);
                    id
                }
            };

            let object_id = attribute.object_id;
            let key = attribute.into_key(case.id, data_source_id);

            let existing = match self.store.find(&key).await {
                Ok(existing) => existing,
                Err(error) => {
                    warn!(instance = %key, error = %error, "Failed to read correlation instance");
                    report.failures.push(InstanceFailure { key, error });
                    continue;
                }
            };

            if existing
                .as_ref()
                .is_some_and(|i| i.known_status == KnownStatus::Known)
            {
                report.skipped_known += 1;
                continue;
            }

            let decision = decide(existing.as_ref().and_then(|i| i.comment.as_deref()));
            if !decision.should_write {
                report.unchanged += 1;
                continue;
            }

            match self
                .store
                .upsert_known_status(&key, decision.status, &decision.comment, Some(object_id))
                .await
            {
                Ok(()) => report.written += 1,
                Err(error) => {
                    warn!(instance = %key, error = %error, "Failed to write correlation instance");
                    report.failures.push(InstanceFailure { key, error });
                }
            }
        }

        Ok(report)
    }

    /// Apply one tag being added to or removed from its object
    pub async fn apply_tag_change(&self, tag: &Tag, change: TagChange) -> SyncResult<SyncReport> {
        if !tag.is_notable() {
            debug!(tag = tag.id, "Tag is not notable, nothing to propagate");
            return Ok(SyncReport::default());
        }

        let current = self.tags_on(tag.target).await?;
        self.sync_object(tag.target, |previous| {
            NotabilityPolicy::decide(&current, tag, change, previous)
        })
        .await
    }

    /// Re-evaluate every object carrying a tag name after its definition
    /// changed
    ///
    /// Objects are deduplicated; artifacts are processed before files. Each
    /// object yields one item, so a failing object does not end the stream.
    pub fn bulk_resync(&self, tag_name: TagName) -> BoxStream<'static, SyncResult<ResyncOutcome>> {
        let engine = self.clone();

        stream::once(async move {
            let tagged = engine.tags.tags_by_name(tag_name.id).await?;
            let targets = resync_targets(&tagged);
            info!(
                tag_name = %tag_name.display_name,
                status = %tag_name.known_status,
                objects = targets.len(),
                "Re-evaluating objects after tag definition change"
            );
            Ok::<_, SyncError>((engine, tag_name, targets))
        })
        .flat_map(|prepared| match prepared {
            Ok((engine, tag_name, targets)) => stream::iter(targets)
                .then(move |object| {
                    let engine = engine.clone();
                    let tag_name = tag_name.clone();
                    async move { engine.resync_object(object, &tag_name).await }
                })
                .boxed(),
            Err(e) => stream::once(async move { Err::<ResyncOutcome, SyncError>(e) }).boxed(),
        })
        .boxed()
    }

    async fn resync_object(&self, object: TaggedObject, tag_name: &TagName) -> SyncResult<ResyncOutcome> {
        let current = self.tags_on(object).await?;

        if NotabilityPolicy::decide_definition_change(&current, tag_name, None)
            == DefinitionDecision::ConflictSkipped
        {
            debug!(%object, "Another notable tag applies, keeping object notable");
            return Ok(ResyncOutcome::ConflictSkipped { object });
        }

        let report = self
            .sync_object(object, |previous| {
                match NotabilityPolicy::decide_definition_change(&current, tag_name, previous) {
                    DefinitionDecision::Apply(decision) => decision,
                    DefinitionDecision::ConflictSkipped => Decision::no_write(),
                }
            })
            .await?;
        Ok(ResyncOutcome::Synced { object, report })
    }

    /// Record the case in the repository; idempotent
    pub async fn record_case(&self, case: &CaseInfo) -> SyncResult<CorrelationCase> {
        match self.store.get_case(&case.name).await? {
            Some(existing) => Ok(existing),
            None => {
                let created = self.store.new_case(case).await?;
                info!(case = %case.name, id = created.id, "Case recorded in correlation repository");
                Ok(created)
            }
        }
    }

    /// Record a data source of the open case; idempotent
    pub async fn record_data_source(&self, data_source: &DataSourceInfo) -> SyncResult<CorrelationDataSource> {
        let case = self.resolve_case().await?;
        if let Some(existing) = self.store.get_data_source(case.id, data_source.object_id).await? {
            return Ok(existing);
        }
        let created = self.store.new_data_source(case.id, data_source).await?;
        info!(
            data_source = %data_source.name,
            id = created.id,
            "Data source recorded in correlation repository"
        );
        Ok(created)
    }

    /// Propagate a data source rename; empty names are ignored
    pub async fn rename_data_source(&self, object_id: i64, new_name: &str) -> SyncResult<()> {
        if new_name.trim().is_empty() {
            debug!(data_source = object_id, "Ignoring empty data source name");
            return Ok(());
        }

        let info = self.content.case_info().await?;
        let case = self
            .store
            .get_case(&info.name)
            .await?
            .ok_or_else(|| SyncError::not_found(format!("case {}", info.name)))?;
        let data_source = self
            .store
            .get_data_source(case.id, object_id)
            .await?
            .ok_or_else(|| SyncError::not_found(format!("data source {}", object_id)))?;

        self.store
            .update_data_source_name(data_source.id, new_name)
            .await?;
        info!(data_source = data_source.id, name = new_name, "Data source renamed");
        Ok(())
    }

    async fn tags_on(&self, object: TaggedObject) -> SyncResult<Vec<Tag>> {
        let tags = match object {
            TaggedObject::File { content_id } => self.tags.tags_on_content(content_id).await?,
            TaggedObject::Artifact { artifact_id, .. } => self.tags.tags_on_artifact(artifact_id).await?,
        };
        Ok(tags)
    }

    /// Attributes of the object, or `None` when it is a known file
    async fn derive_attributes(&self, object: TaggedObject) -> SyncResult<Option<Vec<CorrelationAttribute>>> {
        match object {
            TaggedObject::File { content_id } => {
                let file = self
                    .content
                    .file(content_id)
                    .await?
                    .ok_or_else(|| SyncError::not_found(format!("file {}", content_id)))?;
                if file.is_known() {
                    return Ok(None);
                }
                Ok(Some(self.extractor.derive_file(&file)))
            }
            TaggedObject::Artifact { artifact_id, .. } => {
                let artifact = self
                    .content
                    .artifact(artifact_id)
                    .await?
                    .ok_or_else(|| SyncError::not_found(format!("artifact {}", artifact_id)))?;
                let source = self.content.file(artifact.source_content_id).await?;
                if source.is_some_and(|f| f.is_known()) {
                    return Ok(None);
                }
                Ok(Some(self.extractor.derive_artifact(&artifact)))
            }
        }
    }

    async fn resolve_case(&self) -> SyncResult<CorrelationCase> {
        let info = self.content.case_info().await?;
        self.record_case(&info).await
    }

    async fn resolve_data_source(
        &self,
        case: &CorrelationCase,
        object_id: i64,
    ) -> SyncResult<CorrelationDataSource> {
        if let Some(existing) = self.store.get_data_source(case.id, object_id).await? {
            return Ok(existing);
        }
        let info = self
            .content
            .data_source(object_id)
            .await?
            .ok_or_else(|| SyncError::not_found(format!("data source {}", object_id)))?;
        Ok(self.store.new_data_source(case.id, &info).await?)
    }
}

/// Distinct tagged objects, artifacts first, each group in tag id order
fn resync_targets(tags: &[Tag]) -> Vec<TaggedObject> {
    let mut ordered: Vec<&Tag> = tags.iter().collect();
    ordered.sort_by_key(|t| t.id);

    let mut seen = HashSet::new();
    let (artifacts, files): (Vec<TaggedObject>, Vec<TaggedObject>) = ordered
        .into_iter()
        .map(|t| t.target)
        .filter(|target| seen.insert(*target))
        .partition(|target| matches!(target, TaggedObject::Artifact { .. }));

    artifacts.into_iter().chain(files).collect()
}
