//! Serve command - runs the remote store's batch endpoint.

use latemark::server::SyncServer;
use tokio::signal::unix::{SignalKind, signal};

use crate::cli::ServeArgs;
use crate::storage::open_records;

/// Run the Latemark server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_records(args.data_dir.as_deref()).await?;
    let mut server = SyncServer::new(store.clone());

    let addr = server.start(&format!("{}:{}", args.host, args.port)).await?;

    println!("Latemark Server starting on http://localhost:{}", addr.port());
    println!();
    println!("Available endpoints:");
    println!("  POST /sync         - Batch sync endpoint");
    println!("  GET  /health       - Health check");
    println!();
    println!("Press Ctrl+C to shutdown");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }

    server.stop().await?;
    store.close().await;

    println!("Server shut down");
    Ok(())
}
