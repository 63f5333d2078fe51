//! Single-flight sync runs over the durable queue.
//!
//! [`SyncOrchestrator::run_sync`] snapshots the queue, hands the snapshot to
//! the [`BatchReconciler`], and removes whatever the outcome resolved. At most
//! one run is in flight per orchestrator; a call that arrives while another
//! run is active returns a zero-effect result instead of waiting.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{Instrument, info, info_span, warn};

use super::reconciler::{BatchOutcome, BatchReconciler, ExplicitFailure};
use crate::Result;
use crate::connectivity::ConnectivityMonitor;
use crate::queue::{LocalId, QueueItem, QueueStore};

/// What caused a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Explicit request from the host or operator.
    Manual,
    /// The device came back online.
    ConnectivityRestored,
    /// The host application returned to the foreground.
    Foregrounded,
    /// A configured daily time was reached.
    Scheduled,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncTrigger::Manual => "manual",
            SyncTrigger::ConnectivityRestored => "connectivity-restored",
            SyncTrigger::Foregrounded => "foregrounded",
            SyncTrigger::Scheduled => "scheduled",
        };
        f.write_str(name)
    }
}

/// How a sync run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The batch was delivered and the outcome applied to the queue.
    Completed,
    /// Nothing was pending; no network call was made.
    Empty,
    /// Another run was already in flight; nothing was done.
    SkippedAlreadyRunning,
    /// The device was offline; no network call was made.
    SkippedOffline,
    /// No usable response was obtained; every record was retained.
    TransportFailed(String),
}

/// Result of one [`SyncOrchestrator::run_sync`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub trigger: SyncTrigger,
    pub status: SyncStatus,
    /// Records newly applied remotely.
    pub applied: usize,
    /// Records the remote store already had.
    pub duplicates: usize,
    /// Records the remote store rejected; they stay queued.
    pub failures: Vec<ExplicitFailure>,
    /// Local items removed from the queue.
    pub removed: usize,
    /// Snapshot items left in the queue.
    pub retained: usize,
}

impl SyncResult {
    fn idle(trigger: SyncTrigger, status: SyncStatus, retained: usize) -> Self {
        Self {
            trigger,
            status,
            applied: 0,
            duplicates: 0,
            failures: Vec::new(),
            removed: 0,
            retained,
        }
    }

    /// Number of explicitly rejected records.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether a batch actually reached the remote store.
    pub fn reached_remote(&self) -> bool {
        self.status == SyncStatus::Completed
    }
}

/// Notification published after every run that entered the running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCompleted {
    pub trigger: SyncTrigger,
    pub applied_count: usize,
    pub duplicate_count: usize,
    pub failed_count: usize,
    /// Rejected records with their reasons, for surfacing to operators.
    pub failures: Vec<ExplicitFailure>,
    /// Diagnostic text when the run could not reach a usable outcome.
    pub error: Option<String>,
}

impl SyncCompleted {
    fn from_result(result: &SyncResult) -> Self {
        let error = match &result.status {
            SyncStatus::TransportFailed(reason) => Some(reason.clone()),
            SyncStatus::SkippedOffline => Some("offline".to_string()),
            _ => None,
        };
        Self {
            trigger: result.trigger,
            applied_count: result.applied,
            duplicate_count: result.duplicates,
            failed_count: result.failed(),
            failures: result.failures.clone(),
            error,
        }
    }

    fn from_error(trigger: SyncTrigger, error: &crate::Error) -> Self {
        Self {
            trigger,
            applied_count: 0,
            duplicate_count: 0,
            failed_count: 0,
            failures: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Clears the running flag when a run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives the queue and the reconciler together.
pub struct SyncOrchestrator {
    queue: Arc<dyn QueueStore>,
    reconciler: BatchReconciler,
    connectivity: Arc<ConnectivityMonitor>,
    running: AtomicBool,
    events: broadcast::Sender<SyncCompleted>,
    last_result: Mutex<Option<SyncResult>>,
}

impl SyncOrchestrator {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        reconciler: BatchReconciler,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            queue,
            reconciler,
            connectivity,
            running: AtomicBool::new(false),
            events,
            last_result: Mutex::new(None),
        }
    }

    /// The queue this orchestrator drains.
    pub fn queue(&self) -> &Arc<dyn QueueStore> {
        &self.queue
    }

    /// The connectivity monitor consulted before each network step.
    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Subscribe to sync-completed notifications.
    ///
    /// Slow or absent subscribers never affect the orchestrator; a lagging
    /// receiver simply misses older notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncCompleted> {
        self.events.subscribe()
    }

    /// The result of the most recent run that entered the running state.
    pub fn last_result(&self) -> Option<SyncResult> {
        self.last_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one sync.
    ///
    /// Storage errors while reading or trimming the queue are returned after
    /// the run has ended; anything not yet removed stays queued, which is
    /// safe because remote application is idempotent.
    pub async fn run_sync(&self, trigger: SyncTrigger) -> Result<SyncResult> {
        let Some(guard) = RunningGuard::acquire(&self.running) else {
            tracing::debug!(%trigger, "Sync already running; trigger dropped");
            return Ok(SyncResult::idle(
                trigger,
                SyncStatus::SkippedAlreadyRunning,
                0,
            ));
        };

        let result = self
            .run_pipeline(trigger)
            .instrument(info_span!("run_sync", %trigger))
            .await;
        drop(guard);

        let notification = match &result {
            Ok(r) => {
                *self
                    .last_result
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(r.clone());
                SyncCompleted::from_result(r)
            }
            Err(e) => {
                tracing::error!(%trigger, "Sync failed: {e}");
                SyncCompleted::from_error(trigger, e)
            }
        };
        let _ = self.events.send(notification);

        result
    }

    async fn run_pipeline(&self, trigger: SyncTrigger) -> Result<SyncResult> {
        let items = self.queue.list_pending().await?;
        if items.is_empty() {
            tracing::debug!("Queue empty; nothing to sync");
            return Ok(SyncResult::idle(trigger, SyncStatus::Empty, 0));
        }

        if !self.connectivity.is_online() {
            info!(pending = items.len(), "Offline; sync deferred");
            return Ok(SyncResult::idle(
                trigger,
                SyncStatus::SkippedOffline,
                items.len(),
            ));
        }

        info!(pending = items.len(), "Starting sync");
        let outcome = match self.reconciler.reconcile(&items).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(pending = items.len(), "Batch not delivered, retaining all: {e}");
                return Ok(SyncResult::idle(
                    trigger,
                    SyncStatus::TransportFailed(e.to_string()),
                    items.len(),
                ));
            }
        };

        let removed = self.apply_outcome(&items, &outcome).await?;
        let retained = items.len() - removed;

        for failure in &outcome.explicit_failures {
            if let Some(item) = items.get(failure.index) {
                warn!(
                    local_id = item.local_id,
                    subject_id = item.record.subject_id,
                    reason = %failure.reason,
                    "Record rejected by remote store; kept queued"
                );
            }
        }
        info!(
            applied = outcome.applied_count,
            duplicates = outcome.duplicate_count(),
            failed = outcome.failed_count(),
            removed,
            "Sync finished"
        );

        Ok(SyncResult {
            trigger,
            status: SyncStatus::Completed,
            applied: outcome.applied_count,
            duplicates: outcome.duplicate_count(),
            failures: outcome.explicit_failures,
            removed,
            retained,
        })
    }

    /// Remove resolved items from the queue and return how many were removed.
    async fn apply_outcome(&self, items: &[QueueItem], outcome: &BatchOutcome) -> Result<usize> {
        if outcome.is_complete(items.len()) {
            // Items are in creation order, so the last id bounds the snapshot.
            if let Some(last) = items.last() {
                self.queue.clear_through(last.local_id).await?;
            }
            return Ok(items.len());
        }

        let failed = outcome.failed_indexes();
        let resolved: Vec<LocalId> = items
            .iter()
            .enumerate()
            .filter(|(index, _)| !failed.contains(index))
            .map(|(_, item)| item.local_id)
            .collect();
        self.queue.remove_many(&resolved).await?;
        Ok(resolved.len())
    }
}
