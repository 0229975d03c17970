//! Router tasks
//!
//! Each recognized event becomes exactly one task.

use futures::StreamExt;
use tracing::{debug, error, warn};

use super::CaseEvent;
use crate::core::types::{CaseInfo, DataSourceInfo, Tag};
use crate::policy::TagChange;
use crate::sync::{CorrelationSyncEngine, ResyncOutcome, SyncError, SyncReport, SyncResult};

/// Unit of work processed by the router worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    TagChanged { tag: Tag, change: TagChange },
    TagDefinitionChanged { display_name: String },
    DataSourceAdded { data_source: DataSourceInfo },
    DataSourceRenamed { object_id: i64, new_name: String },
    CaseOpened { case: CaseInfo },
}

/// Summary of a completed task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Instances written
    pub written: usize,
    /// Instance writes that failed
    pub failures: usize,
    /// Objects skipped by the definition-change conflict guard
    pub conflicts_skipped: usize,
}

impl TaskOutcome {
    fn from_report(report: &SyncReport) -> Self {
        Self {
            written: report.written,
            failures: report.failures.len(),
            conflicts_skipped: 0,
        }
    }
}

impl Task {
    /// Translate an event; `None` for events that are ignored
    pub fn from_event(event: CaseEvent) -> Option<Self> {
        let task = match event {
            CaseEvent::ContentTagAdded { tag } | CaseEvent::ArtifactTagAdded { tag } => Task::TagChanged {
                tag,
                change: TagChange::Added,
            },
            CaseEvent::ContentTagDeleted { tag } | CaseEvent::ArtifactTagDeleted { tag } => {
                Task::TagChanged {
                    tag,
                    change: TagChange::Removed,
                }
            }
            CaseEvent::TagDefinitionChanged { display_name } => Task::TagDefinitionChanged { display_name },
            CaseEvent::DataSourceAdded { data_source } => Task::DataSourceAdded { data_source },
            CaseEvent::DataSourceRenamed { object_id, new_name } => {
                Task::DataSourceRenamed { object_id, new_name }
            }
            CaseEvent::CaseOpened { case } => Task::CaseOpened { case },
            CaseEvent::Unrecognized => return None,
        };
        Some(task)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::TagChanged {
                change: TagChange::Added,
                ..
            } => "tag_added",
            Task::TagChanged {
                change: TagChange::Removed,
                ..
            } => "tag_removed",
            Task::TagDefinitionChanged { .. } => "tag_definition_changed",
            Task::DataSourceAdded { .. } => "data_source_added",
            Task::DataSourceRenamed { .. } => "data_source_renamed",
            Task::CaseOpened { .. } => "case_opened",
        }
    }

    /// Run the task against the engine
    pub async fn run(self, engine: &CorrelationSyncEngine) -> SyncResult<TaskOutcome> {
        match self {
            Task::TagChanged { tag, change } => {
                let report = engine.apply_tag_change(&tag, change).await?;
                log_failures(&report);
                Ok(TaskOutcome::from_report(&report))
            }
            Task::TagDefinitionChanged { display_name } => {
                let tag_name = engine
                    .tags()
                    .tag_name_by_display_name(&display_name)
                    .await?
                    .ok_or_else(|| SyncError::NotFound {
                        what: format!("tag name {}", display_name),
                    })?;

                let mut outcome = TaskOutcome::default();
                let mut results = engine.bulk_resync(tag_name);
                while let Some(result) = results.next().await {
                    match result {
                        Ok(ResyncOutcome::Synced { report, .. }) => {
                            log_failures(&report);
                            outcome.written += report.written;
                            outcome.failures += report.failures.len();
                        }
                        Ok(ResyncOutcome::ConflictSkipped { .. }) => outcome.conflicts_skipped += 1,
                        Err(e) if e.is_not_found() => debug!(error = %e, "Tagged object vanished"),
                        Err(e) => {
                            warn!(error = %e, "Re-evaluating tagged object failed");
                            outcome.failures += 1;
                        }
                    }
                }
                Ok(outcome)
            }
            Task::DataSourceAdded { data_source } => {
                engine.record_data_source(&data_source).await?;
                Ok(TaskOutcome::default())
            }
            Task::DataSourceRenamed { object_id, new_name } => {
                engine.rename_data_source(object_id, &new_name).await?;
                Ok(TaskOutcome::default())
            }
            Task::CaseOpened { case } => {
                engine.record_case(&case).await?;
                Ok(TaskOutcome::default())
            }
        }
    }
}

fn log_failures(report: &SyncReport) {
    for failure in &report.failures {
        error!(instance = %failure.key, error = %failure.error, "Correlation instance not updated");
    }
}
