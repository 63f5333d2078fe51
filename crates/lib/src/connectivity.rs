//! Connectivity state and the edges that trigger opportunistic syncs.
//!
//! The monitor never touches the network itself. Hosts tell it what they
//! observe (OS reachability callbacks, a health probe, app lifecycle events)
//! and it turns those observations into [`ConnectivityEvent`]s that the
//! background sync loop listens for.

use tokio::sync::{broadcast, watch};

/// An edge that should prompt an opportunistic sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The device went from offline to online.
    Restored,
    /// The host application came back to the foreground.
    Foregrounded,
}

/// Tracks whether the device is online and publishes transitions.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        let (events, _) = broadcast::channel(16);
        Self { state, events }
    }

    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Record the latest observed connectivity.
    ///
    /// Emits [`ConnectivityEvent::Restored`] only on an offline to online
    /// edge; repeated reports of the same state are ignored. Returns whether
    /// the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.state.send_replace(online);
        if was_online == online {
            return false;
        }

        if online {
            tracing::info!("Connectivity restored");
            let _ = self.events.send(ConnectivityEvent::Restored);
        } else {
            tracing::info!("Connectivity lost");
        }
        true
    }

    /// Report that the host application returned to the foreground.
    pub fn foregrounded(&self) {
        tracing::debug!("Application foregrounded");
        let _ = self.events.send(ConnectivityEvent::Foregrounded);
    }

    /// Subscribe to connectivity edges.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Watch the raw online/offline state.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    /// Monitors start optimistic: the first failed probe flips them offline.
    fn default() -> Self {
        Self::new(true)
    }
}
