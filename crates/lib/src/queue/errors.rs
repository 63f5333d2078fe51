//! Error types for the durable queue store.

use thiserror::Error;

/// Errors that can occur while reading or writing the pending-mutation queue.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QueueError {
    /// The underlying storage layer failed.
    #[cfg(feature = "sqlite")]
    #[error("Queue storage error: {reason}")]
    Storage {
        /// What the store was doing when it failed
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },

    /// A stored row could not be decoded back into a queue item.
    #[error("Corrupt queue row {local_id}: {reason}")]
    CorruptRow {
        /// Identifier of the unreadable row
        local_id: i64,
        /// Why decoding failed
        reason: String,
    },

    /// Creating a runtime or data directory for the store failed.
    #[error("Queue I/O error")]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl QueueError {
    /// Check if this error came from the storage layer.
    pub fn is_storage_error(&self) -> bool {
        #[cfg(feature = "sqlite")]
        if matches!(self, QueueError::Storage { .. }) {
            return true;
        }
        matches!(self, QueueError::Io { .. })
    }

    /// Check if this error indicates unreadable stored data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, QueueError::CorruptRow { .. })
    }
}

impl From<QueueError> for crate::Error {
    fn from(err: QueueError) -> Self {
        crate::Error::Queue(err)
    }
}
