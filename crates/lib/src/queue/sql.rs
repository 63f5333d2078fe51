//! SQLite-backed durable queue store.
//!
//! Items live in the `pending_late_records` table. `local_id` is an
//! `AUTOINCREMENT` key, so ids are never reused even after the table is
//! emptied, and ordering by it reproduces creation order.

use std::path::Path;

use async_trait::async_trait;
use sqlx::AnyPool;

use super::{LocalId, QueueError, QueueItem, QueueStore};
use crate::Result;
use crate::record::{EventDate, LateRecord};
use crate::sql::{self, Schema};

const SCHEMA: Schema = Schema {
    version: 1,
    tables: &["CREATE TABLE IF NOT EXISTS pending_late_records (
        local_id INTEGER PRIMARY KEY AUTOINCREMENT,
        subject_id BIGINT NOT NULL,
        context_id BIGINT NOT NULL,
        actor_id BIGINT NOT NULL,
        event_date TEXT NOT NULL,
        created_at_ms BIGINT NOT NULL
    )"],
    indexes: &[],
};

type Row = (i64, i64, i64, i64, String, i64);

/// Extension trait for sqlx Result types to simplify error handling.
trait SqlxResultExt<T> {
    /// Convert sqlx error to a queue storage error with a context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            QueueError::Storage {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// Queue store persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteQueue {
    pool: AnyPool,
}

impl SqliteQueue {
    /// Open (or create) a queue database at the given path.
    ///
    /// ```ignore
    /// use latemark::queue::SqliteQueue;
    ///
    /// let queue = SqliteQueue::open("pending.db").await?;
    /// ```
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::connect(&sql::file_url(path.as_ref())).await
    }

    /// Create a queue that lives only as long as this instance.
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

    /// Close the underlying pool, waiting for in-flight statements.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn decode(row: Row) -> Result<QueueItem> {
        let (local_id, subject_id, context_id, actor_id, event_date, created_at_ms) = row;
        let event_date = EventDate::parse(&event_date).map_err(|e| QueueError::CorruptRow {
            local_id,
            reason: e.to_string(),
        })?;
        Ok(QueueItem {
            local_id,
            record: LateRecord {
                subject_id,
                context_id,
                actor_id,
                event_date,
            },
            created_at_ms: created_at_ms.max(0) as u64,
        })
    }
}

#[async_trait]
impl QueueStore for SqliteQueue {
    async fn enqueue(&self, record: &LateRecord, created_at_ms: u64) -> Result<LocalId> {
        let local_id: i64 = sqlx::query_scalar(
            "INSERT INTO pending_late_records
                (subject_id, context_id, actor_id, event_date, created_at_ms)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING local_id",
        )
        .bind(record.subject_id)
        .bind(record.context_id)
        .bind(record.actor_id)
        .bind(record.event_date.to_string())
        .bind(created_at_ms as i64)
        .fetch_one(&self.pool)
        .await
        .sql_context("Failed to enqueue record")?;

        tracing::debug!(local_id, subject_id = record.subject_id, "Enqueued late record");
        Ok(local_id)
    }

    async fn list_pending(&self) -> Result<Vec<QueueItem>> {
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT local_id, subject_id, context_id, actor_id, event_date, created_at_ms
             FROM pending_late_records
             ORDER BY local_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .sql_context("Failed to list pending records")?;

        rows.into_iter().map(Self::decode).collect()
    }

    async fn remove_many(&self, local_ids: &[LocalId]) -> Result<()> {
        if local_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .sql_context("Failed to begin removal")?;
        for id in local_ids {
            sqlx::query("DELETE FROM pending_late_records WHERE local_id = $1")
                .bind(*id)
                .execute(&mut *tx)
                .await
                .sql_context("Failed to remove record")?;
        }
        tx.commit().await.sql_context("Failed to commit removal")?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM pending_late_records")
            .execute(&self.pool)
            .await
            .sql_context("Failed to clear queue")?;
        Ok(())
    }

    async fn clear_through(&self, max_local_id: LocalId) -> Result<()> {
        sqlx::query("DELETE FROM pending_late_records WHERE local_id <= $1")
            .bind(max_local_id)
            .execute(&self.pool)
            .await
            .sql_context("Failed to clear queue")?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_late_records")
            .fetch_one(&self.pool)
            .await
            .sql_context("Failed to count pending records")?;
        Ok(count.max(0) as usize)
    }
}
