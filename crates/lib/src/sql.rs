//! Shared SQLite connection and schema plumbing.
//!
//! Both the device-side queue and the remote record store keep their data in
//! SQLite through sqlx's `AnyPool`. This module owns the connection settings
//! and the versioned schema bootstrap they have in common; each store supplies
//! its own table definitions.

use std::path::Path;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

/// Table tracking the schema version of a store.
const CREATE_SCHEMA_VERSION: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version BIGINT PRIMARY KEY
)";

/// Table definitions and version for one store.
pub(crate) struct Schema {
    /// Current schema version. Increment when making schema changes.
    pub version: i64,
    /// `CREATE TABLE IF NOT EXISTS` statements.
    pub tables: &'static [&'static str],
    /// `CREATE INDEX IF NOT EXISTS` statements.
    pub indexes: &'static [&'static str],
}

/// Build a connection URL for a SQLite file, creating it if missing.
pub(crate) fn file_url(path: &Path) -> String {
    // mode=rwc: read-write-create (create file if it doesn't exist)
    format!("sqlite:{}?mode=rwc", path.display())
}

/// Build a connection URL for a private in-memory database.
///
/// Shared cache mode makes every connection in the pool see the same
/// database; the unique name keeps separate instances apart.
pub(crate) fn memory_url() -> String {
    let unique_id = uuid::Uuid::new_v4();
    format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared")
}

/// Open a pool for the given SQLite URL and apply connection pragmas.
pub(crate) async fn connect(url: &str) -> sqlx::Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let is_in_memory = url.contains("mode=memory");

    // The in-memory database is destroyed when its last connection closes,
    // so keep one connection alive for the lifetime of the pool.
    let pool = if is_in_memory {
        AnyPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?
    } else {
        AnyPoolOptions::new().max_connections(5).connect(url).await?
    };

    if is_in_memory {
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await?;
    } else {
        // - journal_mode=WAL: Write-Ahead Logging for better concurrency
        // - synchronous=FULL: an acknowledged enqueue survives power loss
        // - busy_timeout=5000: Wait up to 5s for locks before failing
        sqlx::query(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )
        .execute(&pool)
        .await?;
    }

    Ok(pool)
}

/// Create tables and indexes, and record or migrate the schema version.
pub(crate) async fn initialize(pool: &AnyPool, schema: &Schema) -> sqlx::Result<()> {
    sqlx::query(CREATE_SCHEMA_VERSION).execute(pool).await?;
    for statement in schema.tables {
        sqlx::query(statement).execute(pool).await?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(schema.version)
                .execute(pool)
                .await?;
        }
        Some((current,)) if current < schema.version => {
            // Every released schema is still version 1; later versions add
            // their migration steps here before the version bump.
            tracing::info!(from = current, to = schema.version, "Migrating SQL schema");
            sqlx::query("UPDATE schema_version SET version = $1")
                .bind(schema.version)
                .execute(pool)
                .await?;
        }
        Some(_) => {}
    }

    for statement in schema.indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
