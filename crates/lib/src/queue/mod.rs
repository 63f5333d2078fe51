//! Durable queue of pending late-record mutations.
//!
//! The queue only ever grows through [`QueueStore::enqueue`] and shrinks
//! through the removal operations; items are never updated in place. Each
//! persisted item gets a monotonically increasing `local_id` that defines
//! replay order and never leaves the device.
//!
//! ## Implementations
//!
//! - [`InMemoryQueue`]: process-local, for tests and ephemeral hosts
//! - [`SqliteQueue`] (feature: `sqlite`): survives restarts

use async_trait::async_trait;

use crate::Result;
use crate::record::LateRecord;

mod errors;
mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sql;

pub use errors::QueueError;
pub use in_memory::InMemoryQueue;
#[cfg(feature = "sqlite")]
pub use sql::SqliteQueue;

/// Locally assigned identifier of a queued item.
pub type LocalId = i64;

/// A pending mutation awaiting remote application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// Store-assigned identifier; ordering reflects creation order.
    pub local_id: LocalId,
    /// The mutation itself.
    pub record: LateRecord,
    /// When the mutation was captured, in milliseconds since Unix epoch.
    /// Informational only.
    pub created_at_ms: u64,
}

/// Persistent storage for pending mutations.
///
/// Implementations must make each call individually atomic: producers may
/// enqueue while a sync holds a snapshot, and such items must simply appear
/// in the next [`list_pending`](QueueStore::list_pending).
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a record and return its assigned local id.
    ///
    /// The store does not validate the record; producers are expected to do
    /// that before enqueueing.
    async fn enqueue(&self, record: &LateRecord, created_at_ms: u64) -> Result<LocalId>;

    /// All pending items in creation order.
    async fn list_pending(&self) -> Result<Vec<QueueItem>>;

    /// Remove the given items. Ids that are already absent are ignored.
    async fn remove_many(&self, local_ids: &[LocalId]) -> Result<()>;

    /// Remove every item.
    async fn clear_all(&self) -> Result<()>;

    /// Remove every item whose id is less than or equal to `max_local_id`.
    ///
    /// Items enqueued after a snapshot was taken have larger ids and survive.
    async fn clear_through(&self, max_local_id: LocalId) -> Result<()>;

    /// Number of pending items.
    async fn len(&self) -> Result<usize>;

    /// Whether the queue has no pending items.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
