//! Status snapshots and observer fan-out
//!
//! Observers never read coordinator state directly. Every transition and
//! every drain pushes a `SyncStatus` to registered callbacks and to a
//! `watch` channel for async consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;

/// Coordinator state as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Disconnected, writes go to the local queue
    Offline,
    /// Connected, no drain running
    OnlineIdle,
    /// Connected, a drain is in progress
    OnlineDraining,
}

/// Snapshot pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub pending_count: u64,
    pub state: ConnectionState,
}

impl SyncStatus {
    pub fn offline() -> Self {
        Self {
            is_online: false,
            pending_count: 0,
            state: ConnectionState::Offline,
        }
    }
}

/// Handle returned by `on_status_change`, used to unregister.
pub type ObserverId = u64;

type StatusCallback = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

pub(crate) struct StatusHub {
    tx: watch::Sender<SyncStatus>,
    observers: Mutex<Vec<(ObserverId, StatusCallback)>>,
    next_id: AtomicU64,
}

impl StatusHub {
    pub(crate) fn new(initial: SyncStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn register(&self, callback: StatusCallback) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lock().push((id, callback));
        id
    }

    pub(crate) fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    pub(crate) fn latest(&self) -> SyncStatus {
        *self.tx.borrow()
    }

    pub(crate) fn publish(&self, status: SyncStatus) {
        self.tx.send_replace(status);
        // Call outside the lock so a callback may register or remove observers
        let observers: Vec<StatusCallback> =
            self.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in observers {
            callback(&status);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, StatusCallback)>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
