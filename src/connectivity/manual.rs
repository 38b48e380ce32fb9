//! Connectivity that changes only when told to.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::ConnectivityObserver;

/// Explicitly driven connectivity state, used by tests and `--offline`.
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx }
    }

    /// Update the state. Subscribers are only woken on an actual change.
    pub fn set_connected(&self, connected: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            debug!(connected, "Connectivity changed");
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }
}

#[async_trait]
impl ConnectivityObserver for ManualConnectivity {
    async fn fetch_current_state(&self) -> bool {
        self.is_connected()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
