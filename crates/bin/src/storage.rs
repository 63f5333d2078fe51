//! Store creation and sync wiring shared by the commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use latemark::{
    ConnectivityMonitor, SyncConfig,
    constants::{QUEUE_DB_FILE, RECORDS_DB_FILE},
    queue::{QueueStore, SqliteQueue},
    server::RemoteStore,
    sync::{BatchReconciler, SyncOrchestrator, transports::http::HttpTransport},
};

use crate::cli::{EndpointArgs, QueueArgs};

/// Resolve the data directory and make sure it exists.
async fn data_dir(dir: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data_dir = dir.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    tokio::fs::create_dir_all(&data_dir).await?;
    Ok(data_dir)
}

/// Open the device-side queue.
pub async fn open_queue(args: &QueueArgs) -> Result<Arc<SqliteQueue>, Box<dyn std::error::Error>> {
    let db_path = data_dir(args.data_dir.as_deref()).await?.join(QUEUE_DB_FILE);
    tracing::debug!("Using queue at {}", db_path.display());
    Ok(Arc::new(SqliteQueue::open(&db_path).await?))
}

/// Open the remote store's record database.
pub async fn open_records(dir: Option<&Path>) -> Result<RemoteStore, Box<dyn std::error::Error>> {
    let db_path = data_dir(dir).await?.join(RECORDS_DB_FILE);
    tracing::info!("Using SQLite record store at {}", db_path.display());
    Ok(RemoteStore::open(&db_path).await?)
}

/// Build a sync config from endpoint arguments.
pub fn sync_config(args: &EndpointArgs) -> Result<SyncConfig, Box<dyn std::error::Error>> {
    Ok(SyncConfig {
        endpoint: SyncConfig::parse_endpoint(&args.endpoint)?,
        request_timeout: Duration::from_secs(args.timeout),
        ..SyncConfig::default()
    })
}

/// Wire a queue to an HTTP transport under a fresh orchestrator.
pub fn orchestrator(
    queue: Arc<dyn QueueStore>,
    config: &SyncConfig,
    connectivity: Arc<ConnectivityMonitor>,
) -> Result<Arc<SyncOrchestrator>, Box<dyn std::error::Error>> {
    let transport = Arc::new(HttpTransport::new(&config.endpoint, config.request_timeout)?);
    Ok(Arc::new(SyncOrchestrator::new(
        queue,
        BatchReconciler::new(transport),
        connectivity,
    )))
}
