//! Transport abstractions for batch sync communication.
//!
//! The reconciler talks to the remote store only through [`SyncTransport`],
//! so the HTTP client can be swapped for an in-process or scripted transport
//! in tests.

use async_trait::async_trait;

use crate::Result;
use crate::sync::protocol::{SyncRequest, SyncResponse};

pub mod http;

/// Trait for delivering one batch to the remote store.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Get the transport type identifier (e.g. "http").
    fn transport_type(&self) -> &'static str;

    /// Send a batch and return the remote store's parsed outcome.
    ///
    /// Any failure to obtain a well-formed response (no connection, timeout,
    /// non-success status, non-JSON body) must be returned as an error so the
    /// caller retains the whole batch.
    async fn send_batch(&self, request: &SyncRequest) -> Result<SyncResponse>;
}
