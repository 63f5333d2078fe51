//! Background trigger loop.
//!
//! [`BackgroundSync`] owns the passive trigger wiring: it listens for
//! connectivity edges, checks the daily schedule once per tick, and accepts
//! manual sync requests over a command channel. Every trigger becomes a
//! spawned [`SyncOrchestrator::run_sync`] call, so a trigger that arrives while
//! a run is in flight hits the single-flight guard and is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::{JoinHandle, JoinSet},
    time::{MissedTickBehavior, interval},
};
use tracing::{Instrument, debug, info, info_span};

use super::error::SyncError;
use super::orchestrator::{SyncOrchestrator, SyncResult, SyncTrigger};
use super::schedule::{ScheduleTicker, SyncSchedule};
use crate::clock::Clock;
use crate::connectivity::ConnectivityEvent;
use crate::constants::SCHEDULE_TICK_SECS;
use crate::{Error, Result};

/// Commands that can be sent to the background loop.
pub enum SyncCommand {
    /// Run a sync now and report its result.
    SyncNow {
        trigger: SyncTrigger,
        response: oneshot::Sender<Result<SyncResult>>,
    },
    /// Stop the loop after in-flight runs finish.
    Shutdown,
}

// Manual Debug impl: the response sender carries no useful state.
impl std::fmt::Debug for SyncCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SyncNow { trigger, .. } => {
                f.debug_struct("SyncNow").field("trigger", trigger).finish()
            }
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Background trigger loop that owns the schedule state.
pub struct BackgroundSync {
    orchestrator: Arc<SyncOrchestrator>,
    ticker: ScheduleTicker,
    clock: Arc<dyn Clock>,
    tick_period: Duration,
    connectivity_rx: broadcast::Receiver<ConnectivityEvent>,
    command_rx: mpsc::Receiver<SyncCommand>,
    runs: JoinSet<()>,
}

impl BackgroundSync {
    /// Start the loop with the standard one-minute schedule tick.
    pub fn start(
        orchestrator: Arc<SyncOrchestrator>,
        schedule: SyncSchedule,
        clock: Arc<dyn Clock>,
    ) -> SyncHandle {
        Self::start_with_tick(
            orchestrator,
            schedule,
            clock,
            Duration::from_secs(SCHEDULE_TICK_SECS),
        )
    }

    /// Start the loop with a custom schedule tick period.
    pub fn start_with_tick(
        orchestrator: Arc<SyncOrchestrator>,
        schedule: SyncSchedule,
        clock: Arc<dyn Clock>,
        tick_period: Duration,
    ) -> SyncHandle {
        let (tx, rx) = mpsc::channel(32);
        let connectivity_rx = orchestrator.connectivity().subscribe();

        let background = Self {
            orchestrator,
            ticker: ScheduleTicker::new(schedule),
            clock,
            tick_period,
            connectivity_rx,
            command_rx: rx,
            runs: JoinSet::new(),
        };

        let task = tokio::spawn(background.run());
        SyncHandle {
            command_tx: tx,
            task,
        }
    }

    /// Main event loop
    async fn run(mut self) {
        async move {
            info!(schedule = %self.ticker.schedule(), "Starting background sync");

            let mut schedule_check = interval(self.tick_period);
            schedule_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut connectivity_open = true;

            loop {
                tokio::select! {
                    cmd = self.command_rx.recv() => match cmd {
                        Some(SyncCommand::SyncNow { trigger, response }) => {
                            self.spawn_run(trigger, Some(response));
                        }
                        // Shutdown requested or every handle dropped
                        Some(SyncCommand::Shutdown) | None => break,
                    },

                    event = self.connectivity_rx.recv(), if connectivity_open => match event {
                        Ok(ConnectivityEvent::Restored) => {
                            self.spawn_run(SyncTrigger::ConnectivityRestored, None);
                        }
                        Ok(ConnectivityEvent::Foregrounded) => {
                            self.spawn_run(SyncTrigger::Foregrounded, None);
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            debug!(missed, "Missed connectivity events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            connectivity_open = false;
                        }
                    },

                    _ = schedule_check.tick() => {
                        if self.ticker.check(self.clock.now_local()) {
                            self.spawn_run(SyncTrigger::Scheduled, None);
                        }
                    }

                    Some(joined) = self.runs.join_next(), if !self.runs.is_empty() => {
                        if let Err(e) = joined {
                            tracing::error!("Sync task failed: {e}");
                        }
                    }
                }
            }

            while self.runs.join_next().await.is_some() {}
            info!("Background sync shutting down");
        }
        .instrument(info_span!("background_sync"))
        .await
    }

    fn spawn_run(
        &mut self,
        trigger: SyncTrigger,
        response: Option<oneshot::Sender<Result<SyncResult>>>,
    ) {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runs.spawn(
            async move {
                let result = orchestrator.run_sync(trigger).await;
                match response {
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            tracing::error!(%trigger, "Triggered sync failed: {e}");
                        }
                    }
                }
            }
            .in_current_span(),
        );
    }
}

/// Handle to a running [`BackgroundSync`] loop.
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Request a sync and wait for its result.
    pub async fn sync_now(&self, trigger: SyncTrigger) -> Result<SyncResult> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(SyncCommand::SyncNow {
                trigger,
                response: tx,
            })
            .await
            .map_err(|e| SyncError::CommandSendError(e.to_string()))?;
        rx.await
            .map_err(|e| Error::from(SyncError::CommandSendError(e.to_string())))?
    }

    /// Stop the loop and wait for in-flight runs to finish.
    pub async fn shutdown(self) -> Result<()> {
        // The loop also stops when the channel closes, so a failed send is fine.
        let _ = self.command_tx.send(SyncCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| SyncError::CommandSendError(format!("background task failed: {e}")))?;
        Ok(())
    }
}
