//! The remote side of the batch protocol.
//!
//! [`RemoteStore`] applies batches idempotently; [`router`] exposes it as
//! `POST /sync` and `GET /health`; [`SyncServer`] runs that router on a
//! listener until told to stop.

mod errors;
mod http;
mod store;

pub use errors::ServerError;
pub use http::{HealthResponse, SyncServer, router};
pub use store::RemoteStore;
