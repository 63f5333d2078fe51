//! Synchronization of the pending-record queue with the remote store.
//!
//! The pieces, leaf-first:
//!
//! - [`transports`]: delivery of one batch over the network
//! - [`reconciler`]: one round trip and the interpretation of its outcome
//! - [`orchestrator`]: single-flight runs that trim the queue by the outcome
//! - [`schedule`] and [`background`]: the triggers that start runs
//!
//! A typical host wires them together like this:
//!
//! ```ignore
//! let queue: Arc<dyn QueueStore> = Arc::new(SqliteQueue::open(path).await?);
//! let transport = Arc::new(HttpTransport::new(&config.endpoint, config.request_timeout)?);
//! let monitor = Arc::new(ConnectivityMonitor::default());
//! let orchestrator = Arc::new(SyncOrchestrator::new(
//!     queue,
//!     BatchReconciler::new(transport),
//!     monitor,
//! ));
//! let handle = BackgroundSync::start(orchestrator, config.schedule, Arc::new(SystemClock));
//! ```

pub mod background;
pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod reconciler;
pub mod schedule;
pub mod transports;

pub use background::{BackgroundSync, SyncCommand, SyncHandle};
pub use error::SyncError;
pub use orchestrator::{SyncCompleted, SyncOrchestrator, SyncResult, SyncStatus, SyncTrigger};
pub use reconciler::{BatchOutcome, BatchReconciler, ExplicitFailure};
pub use schedule::{ScheduleTicker, SyncSchedule};
