//! Batch reconciliation against the remote store.
//!
//! The reconciler ships a snapshot of the queue in one round trip and turns
//! the aggregate response into a [`BatchOutcome`]. The remote store does not
//! say which records were duplicates; they are inferred from the counts and
//! must be treated as resolved, never as failures.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::error::SyncError;
use super::protocol::{SyncRequest, SyncResponse};
use super::transports::SyncTransport;
use crate::Result;
use crate::queue::QueueItem;

/// A record the remote store explicitly rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitFailure {
    /// Position of the record in the batch that was sent.
    pub index: usize,
    /// Human-readable reason from the remote store.
    pub reason: String,
}

/// Structured result of one batch round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records newly inserted by the remote store.
    pub applied_count: usize,
    /// Records rejected, in the order the remote store listed them.
    pub explicit_failures: Vec<ExplicitFailure>,
    /// Records the remote store looked at.
    pub total_processed: usize,
}

impl BatchOutcome {
    /// Records the remote store skipped because their natural key already
    /// existed.
    pub fn duplicate_count(&self) -> usize {
        self.total_processed
            .saturating_sub(self.applied_count)
            .saturating_sub(self.explicit_failures.len())
    }

    /// Number of explicit failures.
    pub fn failed_count(&self) -> usize {
        self.explicit_failures.len()
    }

    /// True when every record of a batch of `batch_len` was applied or was a
    /// duplicate.
    pub fn is_complete(&self, batch_len: usize) -> bool {
        self.explicit_failures.is_empty() && self.total_processed == batch_len
    }

    /// Batch positions that were explicitly rejected.
    pub fn failed_indexes(&self) -> HashSet<usize> {
        self.explicit_failures.iter().map(|f| f.index).collect()
    }
}

/// Sends queue snapshots to the remote store and interprets the result.
#[derive(Clone)]
pub struct BatchReconciler {
    transport: Arc<dyn SyncTransport>,
}

impl BatchReconciler {
    pub fn new(transport: Arc<dyn SyncTransport>) -> Self {
        Self { transport }
    }

    /// Reconcile a batch exactly as read from the queue.
    ///
    /// An empty batch short-circuits without a network call. Any transport
    /// or protocol problem is returned as an error: the caller must then
    /// assume nothing about any record in the batch.
    pub async fn reconcile(&self, batch: &[QueueItem]) -> Result<BatchOutcome> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let request = SyncRequest::from_records(batch.iter().map(|item| &item.record));
        debug!(
            records = batch.len(),
            transport = self.transport.transport_type(),
            "Sending batch"
        );

        let response = self.transport.send_batch(&request).await?;
        let outcome = interpret(batch.len(), response)?;

        debug!(
            applied = outcome.applied_count,
            duplicates = outcome.duplicate_count(),
            failed = outcome.failed_count(),
            "Batch reconciled"
        );
        Ok(outcome)
    }
}

/// Check a response against the batch it answers and convert it.
fn interpret(batch_len: usize, response: SyncResponse) -> Result<BatchOutcome> {
    let inconsistent = |reason: String| -> crate::Error {
        SyncError::InconsistentResponse(reason).into()
    };

    if response.total_processed != batch_len {
        return Err(inconsistent(format!(
            "processed {} of {batch_len} records",
            response.total_processed
        )));
    }

    let mut seen = HashSet::new();
    for failed in &response.failed_records {
        if failed.index >= batch_len {
            return Err(inconsistent(format!(
                "failure index {} outside batch of {batch_len}",
                failed.index
            )));
        }
        if !seen.insert(failed.index) {
            return Err(inconsistent(format!(
                "failure index {} reported twice",
                failed.index
            )));
        }
    }

    if response.applied_count + response.failed_records.len() > response.total_processed {
        return Err(inconsistent(format!(
            "{} applied and {} failed exceeds {} processed",
            response.applied_count,
            response.failed_records.len(),
            response.total_processed
        )));
    }

    if response.failed_count != response.failed_records.len() {
        warn!(
            failed_count = response.failed_count,
            listed = response.failed_records.len(),
            "failedCount disagrees with failedRecords; using the list"
        );
    }

    Ok(BatchOutcome {
        applied_count: response.applied_count,
        explicit_failures: response
            .failed_records
            .into_iter()
            .map(|f| ExplicitFailure {
                index: f.index,
                reason: f.reason,
            })
            .collect(),
        total_processed: response.total_processed,
    })
}
