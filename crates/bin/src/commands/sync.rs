//! One-shot sync command.

use std::sync::Arc;

use latemark::{
    ConnectivityMonitor,
    sync::{SyncResult, SyncStatus, SyncTrigger},
};

use super::health::{health_url, probe};
use crate::cli::SyncArgs;
use crate::output::{OutputFormat, print_table};
use crate::storage::{open_queue, orchestrator, sync_config};

/// Run the `sync` command
pub async fn run(args: &SyncArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let config = sync_config(&args.remote)?;
    let queue = open_queue(&args.queue).await?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let online = probe(&client, &health_url(&config.endpoint)?).await;
    let connectivity = Arc::new(ConnectivityMonitor::new(online));

    let orchestrator = orchestrator(queue, &config, connectivity)?;
    let result = orchestrator.run_sync(SyncTrigger::Manual).await?;

    match format {
        OutputFormat::Human => print_result(&result),
        OutputFormat::Json => {
            let failures: Vec<_> = result
                .failures
                .iter()
                .map(|f| serde_json::json!({ "index": f.index, "reason": f.reason }))
                .collect();
            let body = serde_json::json!({
                "status": status_label(&result.status),
                "applied": result.applied,
                "duplicates": result.duplicates,
                "failed": failures,
                "removed": result.removed,
                "retained": result.retained,
            });
            println!("{}", serde_json::to_string(&body)?);
        }
    }

    if let SyncStatus::TransportFailed(reason) = &result.status {
        return Err(format!("sync failed, all marks kept queued: {reason}").into());
    }
    Ok(())
}

fn status_label(status: &SyncStatus) -> &'static str {
    match status {
        SyncStatus::Completed => "completed",
        SyncStatus::Empty => "empty",
        SyncStatus::SkippedAlreadyRunning => "already-running",
        SyncStatus::SkippedOffline => "offline",
        SyncStatus::TransportFailed(_) => "failed",
    }
}

fn print_result(result: &SyncResult) {
    match &result.status {
        SyncStatus::Empty => println!("Nothing to sync."),
        SyncStatus::SkippedOffline => {
            println!("Remote store unreachable; {} marks kept queued.", result.retained);
        }
        SyncStatus::SkippedAlreadyRunning => println!("A sync is already running."),
        SyncStatus::TransportFailed(reason) => {
            println!("Sync failed ({reason}); {} marks kept queued.", result.retained);
        }
        SyncStatus::Completed => {
            println!(
                "Synced: {} applied, {} already present, {} rejected.",
                result.applied,
                result.duplicates,
                result.failed()
            );
            let rows: Vec<Vec<String>> = result
                .failures
                .iter()
                .map(|f| vec![f.index.to_string(), f.reason.clone()])
                .collect();
            print_table(&["INDEX", "REASON"], &rows);
        }
    }
}
