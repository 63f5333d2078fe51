//! In-memory queue store.
//!
//! Entries are lost on restart. Used by tests and by hosts that do not need
//! durability.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LocalId, QueueItem, QueueStore};
use crate::Result;
use crate::record::LateRecord;

#[derive(Debug, Default)]
struct Inner {
    next_id: LocalId,
    items: BTreeMap<LocalId, QueueItem>,
}

/// Queue store backed by an ordered map.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    inner: Mutex<Inner>,
}

impl InMemoryQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueue {
    async fn enqueue(&self, record: &LateRecord, created_at_ms: u64) -> Result<LocalId> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let local_id = inner.next_id;
        inner.items.insert(
            local_id,
            QueueItem {
                local_id,
                record: *record,
                created_at_ms,
            },
        );
        Ok(local_id)
    }

    async fn list_pending(&self) -> Result<Vec<QueueItem>> {
        Ok(self.inner.lock().await.items.values().cloned().collect())
    }

    async fn remove_many(&self, local_ids: &[LocalId]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for id in local_ids {
            inner.items.remove(id);
        }
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.inner.lock().await.items.clear();
        Ok(())
    }

    async fn clear_through(&self, max_local_id: LocalId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.items.retain(|id, _| *id > max_local_id);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.lock().await.items.len())
    }
}
