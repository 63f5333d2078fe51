//! Wire format for the batch sync endpoint.
//!
//! One `POST /sync` carries every pending record. Each record is tagged with
//! its position in the batch; that `index` is the only correlation key the
//! response uses, so local storage ids never leave the device.

use serde::{Deserialize, Serialize};

use crate::record::{EventDate, LateRecord};

/// Path of the batch endpoint, relative to the configured base URL.
pub const SYNC_PATH: &str = "sync";

/// A batch of records to apply remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub records: Vec<WireRecord>,
}

impl SyncRequest {
    /// Build a request from records in batch order, assigning indexes.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LateRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| WireRecord::new(index, record))
            .collect();
        Self { records }
    }
}

/// One record as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    /// Position of the record in the batch, starting at 0.
    pub index: usize,
    pub subject_id: i64,
    pub context_id: i64,
    pub actor_id: i64,
    pub event_date: EventDate,
}

impl WireRecord {
    pub fn new(index: usize, record: &LateRecord) -> Self {
        Self {
            index,
            subject_id: record.subject_id,
            context_id: record.context_id,
            actor_id: record.actor_id,
            event_date: record.event_date,
        }
    }
}

/// Aggregate outcome of a batch as reported by the remote store.
///
/// Duplicates are not listed: they are the records counted in
/// `total_processed` but in neither `applied_count` nor `failed_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub total_processed: usize,
    pub applied_count: usize,
    pub failed_count: usize,
    #[serde(default)]
    pub failed_records: Vec<FailedRecord>,
}

/// A record the remote store rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    /// Batch position of the rejected record.
    pub index: usize,
    /// The record as the server received it.
    #[serde(default)]
    pub record: serde_json::Value,
    /// Human-readable rejection reason.
    pub reason: String,
}

/// Error body returned when a request cannot be processed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
