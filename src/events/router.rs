//! Single-worker event router

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::task::Task;
use super::{CaseEvent, RouterError, ShutdownMode};
use crate::sync::CorrelationSyncEngine;

/// Router counters
#[derive(Debug, Default)]
pub struct RouterStats {
    /// Tasks accepted by `submit`
    pub submitted: AtomicU64,
    /// Tasks that ran to completion
    pub processed: AtomicU64,
    /// Tasks abandoned on an error
    pub failed: AtomicU64,
    /// Tasks whose object no longer exists
    pub not_found: AtomicU64,
    /// Events with no task
    pub ignored: AtomicU64,
    /// Tasks skipped while the repository was disabled
    pub skipped_disabled: AtomicU64,
    /// Tasks dropped by a cancelling shutdown
    pub dropped: AtomicU64,
    /// Instance writes that failed inside completed tasks
    pub instance_failures: AtomicU64,
    /// Tasks waiting in the queue
    pub queue_depth: AtomicU64,
}

impl RouterStats {
    /// Create a snapshot of current stats
    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            submitted: self.submitted.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            not_found: self.not_found.load(Ordering::SeqCst),
            ignored: self.ignored.load(Ordering::SeqCst),
            skipped_disabled: self.skipped_disabled.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
            instance_failures: self.instance_failures.load(Ordering::SeqCst),
            queue_depth: self.queue_depth.load(Ordering::SeqCst),
        }
    }
}

/// Snapshot of router statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterStatsSnapshot {
    pub submitted: u64,
    pub processed: u64,
    pub failed: u64,
    pub not_found: u64,
    pub ignored: u64,
    pub skipped_disabled: u64,
    pub dropped: u64,
    pub instance_failures: u64,
    pub queue_depth: u64,
}

/// Routes case events to a single FIFO worker
///
/// `submit` never blocks. Tasks run strictly in submission order and never
/// concurrently. There is no per-task timeout, so a task that never
/// completes stalls every task queued behind it.
pub struct EventRouter {
    sender: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    stats: Arc<RouterStats>,
}

impl EventRouter {
    /// Spawn the worker on the current tokio runtime
    ///
    /// While `enabled` reads false, tasks are taken off the queue and
    /// skipped.
    pub fn start(engine: CorrelationSyncEngine, enabled: watch::Receiver<bool>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let stats = Arc::new(RouterStats::default());

        let worker = tokio::spawn(run_worker(
            engine,
            receiver,
            enabled,
            cancel.clone(),
            stats.clone(),
        ));
        info!("Event router started");

        Self {
            sender: Mutex::new(Some(sender)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            cancel,
            stats,
        }
    }

    /// Queue the task for an event
    ///
    /// Unrecognized events are dropped without error.
    pub fn submit(&self, event: CaseEvent) -> Result<(), RouterError> {
        let kind = event.kind();
        let Some(task) = Task::from_event(event) else {
            debug!(kind, "Ignoring unrecognized case event");
            self.stats.ignored.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        };

        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(RouterError::Closed)?;

        self.stats.queue_depth.fetch_add(1, Ordering::SeqCst);
        if sender.send(task).is_err() {
            self.stats.queue_depth.fetch_sub(1, Ordering::SeqCst);
            return Err(RouterError::Closed);
        }
        self.stats.submitted.fetch_add(1, Ordering::SeqCst);
        debug!(kind, "Case event queued");
        Ok(())
    }

    /// Stop the router and wait for the worker to exit
    ///
    /// Later calls return immediately. Submissions fail from the moment
    /// this is called.
    pub async fn shutdown(&self, mode: ShutdownMode) {
        // Closing the channel lets the worker drain the queue and exit
        drop(self.sender.lock().take());
        if mode == ShutdownMode::Cancel {
            self.cancel.cancel();
        }

        let Some(handle) = self.worker.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.await {
            error!(error = %e, "Event router worker ended abnormally");
        }

        let stats = self.stats.snapshot();
        info!(
            mode = ?mode,
            processed = stats.processed,
            failed = stats.failed,
            dropped = stats.dropped,
            "Event router stopped"
        );
    }

    /// Whether new events are accepted
    pub fn is_accepting(&self) -> bool {
        self.sender.lock().is_some()
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }
}

async fn run_worker(
    engine: CorrelationSyncEngine,
    mut receiver: mpsc::UnboundedReceiver<Task>,
    enabled: watch::Receiver<bool>,
    cancel: CancellationToken,
    stats: Arc<RouterStats>,
) {
    loop {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            task = receiver.recv() => match task {
                Some(task) => task,
                None => break,
            },
        };
        stats.queue_depth.fetch_sub(1, Ordering::SeqCst);

        let kind = task.kind();
        if !*enabled.borrow() {
            debug!(task = kind, "Correlation repository disabled, skipping task");
            stats.skipped_disabled.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        match AssertUnwindSafe(task.run(&engine)).catch_unwind().await {
            Ok(Ok(outcome)) => {
                stats.processed.fetch_add(1, Ordering::SeqCst);
                stats
                    .instance_failures
                    .fetch_add(outcome.failures as u64, Ordering::SeqCst);
                debug!(
                    task = kind,
                    written = outcome.written,
                    failures = outcome.failures,
                    conflicts_skipped = outcome.conflicts_skipped,
                    "Task complete"
                );
            }
            Ok(Err(e)) if e.is_not_found() => {
                stats.not_found.fetch_add(1, Ordering::SeqCst);
                debug!(task = kind, error = %e, "Task target not found");
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!(task = kind, error = %e, "Task abandoned");
            }
            Err(_) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!(task = kind, "Task panicked");
            }
        }
    }

    let mut dropped = 0u64;
    while receiver.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        stats.queue_depth.fetch_sub(dropped, Ordering::SeqCst);
        stats.dropped.fetch_add(dropped, Ordering::SeqCst);
        warn!(dropped, "Queued tasks dropped on shutdown");
    }
}
