//! The producer side: capturing "mark late" actions into the queue.

use std::sync::Arc;

use crate::clock::Clock;
use crate::queue::{LocalId, QueueStore};
use crate::record::LateRecord;
use crate::Result;

/// Validates operator actions and records them in the durable queue.
///
/// Records that fail validation are rejected here and never queued.
#[derive(Clone)]
pub struct LateMarker {
    queue: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
}

impl LateMarker {
    pub fn new(queue: Arc<dyn QueueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock }
    }

    /// Mark `subject_id` late in `context_id` on `event_date` (`YYYY-MM-DD`).
    ///
    /// Returns the local id of the queued mutation. Works regardless of
    /// connectivity; delivery happens on the next sync.
    pub async fn mark_late(
        &self,
        subject_id: i64,
        context_id: i64,
        actor_id: i64,
        event_date: &str,
    ) -> Result<LocalId> {
        let record = LateRecord::parse(subject_id, context_id, actor_id, event_date)?;
        self.enqueue(&record).await
    }

    /// Queue an already constructed record after validating it.
    pub async fn enqueue(&self, record: &LateRecord) -> Result<LocalId> {
        record.validate()?;
        let local_id = self
            .queue
            .enqueue(record, self.clock.now_millis())
            .await?;
        tracing::info!(
            local_id,
            subject_id = record.subject_id,
            event_date = %record.event_date,
            "Late mark queued"
        );
        Ok(local_id)
    }
}
