//! Constants used throughout the Latemark library.
//!
//! Central definitions for defaults shared by the library and the CLI.

/// Daily wall-clock times at which a scheduled sync runs.
pub const DEFAULT_SYNC_TIMES: &str = "07:30,16:00";

/// Period of the background loop's schedule check, in seconds.
pub const SCHEDULE_TICK_SECS: u64 = 60;

/// Default deadline for one batch request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default period of the host's reachability probe, in seconds.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Default base URL of the remote store.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/";

/// File name of the device-side queue database.
pub const QUEUE_DB_FILE: &str = "latemark-queue.db";

/// File name of the remote store database.
pub const RECORDS_DB_FILE: &str = "latemark-records.db";
