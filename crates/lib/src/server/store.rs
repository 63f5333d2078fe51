//! SQLite-backed store of applied late records.
//!
//! The natural key `(subject_id, context_id, event_date)` is unique, and
//! inserts skip rows that already exist, so applying the same record any
//! number of times leaves exactly one row.

use std::path::Path;

use serde_json::Value;
use sqlx::AnyPool;

use super::ServerError;
use crate::Result;
use crate::record::{EventDate, LateRecord};
use crate::sql::{self, Schema};
use crate::sync::protocol::{FailedRecord, SyncResponse};

const SCHEMA: Schema = Schema {
    version: 1,
    tables: &["CREATE TABLE IF NOT EXISTS late_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        subject_id BIGINT NOT NULL,
        context_id BIGINT NOT NULL,
        actor_id BIGINT NOT NULL,
        event_date TEXT NOT NULL,
        received_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (subject_id, context_id, event_date)
    )"],
    indexes: &["CREATE INDEX IF NOT EXISTS idx_late_records_date ON late_records(event_date)"],
};

const INSERT_IF_ABSENT: &str = "INSERT INTO late_records (subject_id, context_id, actor_id, event_date)
     VALUES ($1, $2, $3, $4)
     ON CONFLICT (subject_id, context_id, event_date) DO NOTHING";

/// Extension trait for sqlx Result types to simplify error handling.
trait SqlxResultExt<T> {
    /// Convert sqlx error to a record store error with a context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            ServerError::Storage {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// The remote side's record table.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    pool: AnyPool,
}

impl RemoteStore {
    /// Open (or create) a record database at the given path.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::connect(&sql::file_url(path.as_ref())).await
    }

    /// Create a store that lives only as long as this instance.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&sql::memory_url()).await
    }

    async fn connect(url: &str) -> Result<Self> {
        let pool = sql::connect(url)
            .await
            .sql_context("Failed to connect to SQLite")?;
        sql::initialize(&pool, &SCHEMA)
            .await
            .sql_context("Schema initialization failed")?;
        Ok(Self { pool })
    }

    /// Apply one batch of untyped records inside a single transaction.
    ///
    /// Each record is reported at its `index` field when it carries a valid
    /// one, otherwise at its position in `records`. Invalid records and
    /// per-record insert errors become failures without affecting siblings;
    /// existing natural keys are skipped and counted in neither `applied` nor
    /// `failed`.
    pub async fn apply_batch(&self, records: &[Value]) -> Result<SyncResponse> {
        let mut applied_count = 0;
        let mut failed_records = Vec::new();

        if records.is_empty() {
            return Ok(SyncResponse {
                total_processed: 0,
                applied_count,
                failed_count: 0,
                failed_records,
            });
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .sql_context("Failed to begin batch transaction")?;

        for (position, value) in records.iter().enumerate() {
            let index = value
                .get("index")
                .and_then(Value::as_u64)
                .map_or(position, |i| i as usize);

            let record = match LateRecord::from_json(value) {
                Ok(record) => record,
                Err(e) => {
                    failed_records.push(FailedRecord {
                        index,
                        record: value.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let inserted = sqlx::query(INSERT_IF_ABSENT)
                .bind(record.subject_id)
                .bind(record.context_id)
                .bind(record.actor_id)
                .bind(record.event_date.to_string())
                .execute(&mut *tx)
                .await;

            match inserted {
                Ok(result) if result.rows_affected() > 0 => applied_count += 1,
                Ok(_) => {
                    tracing::debug!(index, subject_id = record.subject_id, "Duplicate record skipped");
                }
                Err(e) => {
                    tracing::warn!(index, "Record insert failed: {e}");
                    failed_records.push(FailedRecord {
                        index,
                        record: value.clone(),
                        reason: format!("Database error: {e}"),
                    });
                }
            }
        }

        tx.commit()
            .await
            .sql_context("Failed to commit batch transaction")?;

        tracing::info!(
            total = records.len(),
            applied = applied_count,
            failed = failed_records.len(),
            "Batch applied"
        );

        Ok(SyncResponse {
            total_processed: records.len(),
            applied_count,
            failed_count: failed_records.len(),
            failed_records,
        })
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM late_records")
            .fetch_one(&self.pool)
            .await
            .sql_context("Failed to count records")?;
        Ok(count as u64)
    }

    /// All stored records in insertion order.
    pub async fn records(&self) -> Result<Vec<LateRecord>> {
        let rows: Vec<(i64, i64, i64, String)> = sqlx::query_as(
            "SELECT subject_id, context_id, actor_id, event_date FROM late_records ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .sql_context("Failed to list records")?;

        rows.into_iter()
            .map(|(subject_id, context_id, actor_id, event_date)| {
                let event_date = EventDate::parse(&event_date).map_err(|e| ServerError::Storage {
                    reason: format!("stored date '{event_date}' is unreadable: {e}"),
                    source: None,
                })?;
                Ok(LateRecord {
                    subject_id,
                    context_id,
                    actor_id,
                    event_date,
                })
            })
            .collect()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
