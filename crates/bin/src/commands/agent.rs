//! Agent command - keeps the queue draining in the background.
//!
//! A probe loop feeds the connectivity monitor, the background sync loop
//! turns connectivity edges and scheduled times into runs, and every
//! sync-completed notification is logged.

use std::sync::Arc;
use std::time::Duration;

use latemark::{
    ConnectivityMonitor, SystemClock,
    sync::{BackgroundSync, SyncCompleted, SyncSchedule},
};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use url::Url;

use super::health::{health_url, probe};
use crate::cli::AgentArgs;
use crate::storage::{open_queue, orchestrator, sync_config};

/// Run the `agent` command
pub async fn run(args: &AgentArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = sync_config(&args.remote)?;
    config.schedule = SyncSchedule::parse(&args.sync_times)?;
    config.probe_interval = Duration::from_secs(args.probe_interval.max(1));

    let queue = open_queue(&args.queue).await?;
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let health = health_url(&config.endpoint)?;

    // Start offline so the first successful probe counts as a restoration
    let connectivity = Arc::new(ConnectivityMonitor::new(false));
    let orchestrator = orchestrator(queue, &config, connectivity.clone())?;

    let notifications = tokio::spawn(log_notifications(orchestrator.subscribe()));
    let prober = tokio::spawn(probe_loop(
        client,
        health,
        connectivity,
        config.probe_interval,
    ));
    let handle = BackgroundSync::start(orchestrator, config.schedule.clone(), Arc::new(SystemClock));

    println!("Latemark agent syncing to {}", config.endpoint);
    println!("Scheduled syncs: {}", config.schedule);
    println!("Press Ctrl+C to shutdown");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }

    prober.abort();
    handle.shutdown().await?;
    notifications.abort();

    println!("Agent shut down");
    Ok(())
}

async fn probe_loop(
    client: reqwest::Client,
    url: Url,
    connectivity: Arc<ConnectivityMonitor>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let online = probe(&client, &url).await;
        if connectivity.set_online(online) {
            tracing::info!(online, "Connectivity changed");
        }
    }
}

async fn log_notifications(mut events: broadcast::Receiver<SyncCompleted>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(error) = &event.error {
                    tracing::warn!(trigger = %event.trigger, "Sync did not complete: {error}");
                    continue;
                }
                tracing::info!(
                    trigger = %event.trigger,
                    applied = event.applied_count,
                    duplicates = event.duplicate_count,
                    failed = event.failed_count,
                    "Sync completed"
                );
                for failure in &event.failures {
                    tracing::warn!(index = failure.index, reason = %failure.reason, "Mark rejected");
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Missed sync notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
