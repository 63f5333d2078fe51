//!
//! Latemark: offline-first recording of late arrivals.
//! This library provides the device-side queue and sync engine, and the remote batch endpoint they talk to.
//!
//! ## Core Concepts
//!
//! * **Late records (`record::LateRecord`)**: The unit of data. A record says that a subject arrived late in a context on a calendar day, and is identified remotely by its natural key.
//! * **Queue (`queue::QueueStore`)**: A durable FIFO of records waiting to be delivered. Items are only removed once the remote store has accounted for them.
//! * **Producer (`producer::LateMarker`)**: Validates operator actions and appends them to the queue, online or not.
//! * **Sync (`sync::SyncOrchestrator`)**: Single-flight runs that send the whole queue as one indexed batch and trim the queue by the per-index outcome.
//!     * **Reconciler (`sync::BatchReconciler`)**: One round trip, its sanity checks, and the derived applied/duplicate/failed counts.
//!     * **Triggers (`sync::BackgroundSync`)**: Connectivity restoration, foregrounding, manual requests and daily scheduled times.
//! * **Remote store (`server::RemoteStore`)**: Applies batches idempotently, so resending a record never creates a second copy.

pub mod clock;
pub mod config;
pub mod connectivity;
pub mod constants;
pub mod producer;
pub mod queue;
pub mod record;
#[cfg(feature = "sqlite")]
pub mod server;
#[cfg(feature = "sqlite")]
mod sql;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock, format_millis};
pub use config::SyncConfig;
pub use connectivity::ConnectivityMonitor;
pub use producer::LateMarker;
pub use record::{EventDate, LateRecord, NaturalKey};

/// Result type used throughout the Latemark library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Latemark library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured validation errors from the record module
    #[error(transparent)]
    Record(record::RecordError),

    /// Structured storage errors from the queue module
    #[error(transparent)]
    Queue(queue::QueueError),

    /// Structured sync errors from the sync module
    #[error(transparent)]
    Sync(sync::SyncError),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),

    /// Structured remote store errors from the server module
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Server(server::ServerError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Record(_) => "record",
            Error::Queue(_) => "queue",
            Error::Sync(_) => "sync",
            Error::Config(_) => "config",
            #[cfg(feature = "sqlite")]
            Error::Server(_) => "server",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error is a rejected record.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Record(_) => true,
            #[cfg(feature = "sqlite")]
            Error::Server(server_err) => server_err.is_bad_request(),
            _ => false,
        }
    }

    /// Check if this error means a batch outcome is unknown.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_transport_failure(),
            _ => false,
        }
    }

    /// Check if this is a network/connection error.
    pub fn is_network_error(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_network_error(),
            _ => false,
        }
    }

    /// Check if this error is storage-related.
    pub fn is_storage_error(&self) -> bool {
        match self {
            Error::Queue(queue_err) => queue_err.is_storage_error(),
            #[cfg(feature = "sqlite")]
            Error::Server(server_err) => server_err.is_storage_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Queue(queue_err) => queue_err.is_corruption(),
            _ => false,
        }
    }

    /// Check if this error is configuration-related.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Sync(sync_err) => sync_err.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Queue(queue::QueueError::Io { .. }) => true,
            _ => false,
        }
    }
}
