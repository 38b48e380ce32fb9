//! Sync coordinator: routes writes to the remote store or the local queue
//! and drains the queue when connectivity returns.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::outcome::{DrainOutcome, DrainReport, ManualSyncOutcome, WriteOutcome, WriteRequest};
use super::status::{ConnectionState, ObserverId, StatusHub, SyncStatus};
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityObserver;
use crate::queue::{LocalQueue, NewTrainingRecord};
use crate::remote::RemoteStore;

/// One per process. Construct it, wrap it in an `Arc`, and hand it to
/// whoever records workouts or shows sync status.
pub struct SyncCoordinator {
    queue: Arc<LocalQueue>,
    remote: Arc<dyn RemoteStore>,
    collection: String,
    online: AtomicBool,
    /// Held for the whole drain; `try_lock` failure means a drain is running
    drain_lock: tokio::sync::Mutex<()>,
    draining: AtomicBool,
    /// Records the queue refused to store, oldest first
    overflow: Mutex<VecDeque<NewTrainingRecord>>,
    overflow_capacity: usize,
    status: StatusHub,
}

/// Clears the draining flag even if the drain future is dropped mid-flight.
struct DrainGuard<'a> {
    _lock: tokio::sync::MutexGuard<'a, ()>,
    draining: &'a AtomicBool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.draining.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    /// Create a coordinator in the offline state.
    pub fn new(queue: Arc<LocalQueue>, remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self {
            queue,
            remote,
            collection: config.collection.clone(),
            online: AtomicBool::new(false),
            drain_lock: tokio::sync::Mutex::new(()),
            draining: AtomicBool::new(false),
            overflow: Mutex::new(VecDeque::new()),
            overflow_capacity: config.overflow_capacity,
            status: StatusHub::new(SyncStatus::offline()),
        }
    }

    /// Apply the observer's current state, then follow its changes until the
    /// returned handle is shut down. A connected start drains right away.
    pub async fn start(self: &Arc<Self>, observer: Arc<dyn ConnectivityObserver>) -> SyncHandle {
        // Subscribe before probing so no transition slips between the two
        let mut changes = observer.subscribe();
        let connected = observer.fetch_current_state().await;
        self.online.store(connected, Ordering::SeqCst);
        self.publish_status();
        info!(online = connected, pending = self.pending_count(), "Sync coordinator started");

        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move {
            if connected {
                coordinator.drain().await;
            }
            while changes.changed().await.is_ok() {
                let connected = *changes.borrow_and_update();
                coordinator.handle_connectivity_change(connected).await;
            }
            debug!("Connectivity observer closed");
        });

        SyncHandle { task: Some(task) }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ConnectionState {
        if !self.is_online() {
            ConnectionState::Offline
        } else if self.draining.load(Ordering::SeqCst) {
            ConnectionState::OnlineDraining
        } else {
            ConnectionState::OnlineIdle
        }
    }

    /// Pending records in the queue plus any held in the overflow buffer.
    /// A queue read failure counts as zero queued records.
    pub fn pending_count(&self) -> u64 {
        let queued = self.queue.count_pending().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count pending records");
            0
        });
        queued + self.overflow_len() as u64
    }

    /// Latest snapshot published to observers.
    pub fn status(&self) -> SyncStatus {
        self.status.latest()
    }

    /// Register an observer called with every published status.
    pub fn on_status_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        self.status.register(Arc::new(callback))
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.status.unregister(id)
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn queue(&self) -> &LocalQueue {
        &self.queue
    }

    fn publish_status(&self) {
        let status = SyncStatus {
            is_online: self.is_online(),
            pending_count: self.pending_count(),
            state: self.state(),
        };
        self.status.publish(status);
    }

    /// Record a training set. Online writes go to the remote store first and
    /// fall back to the local queue on any failure; offline writes go
    /// straight to the queue.
    pub async fn record_write(&self, request: WriteRequest) -> WriteOutcome {
        let record = request.into_record();
        if let Err(e) = record.validate() {
            warn!(error = %e, "Rejected training record");
            return WriteOutcome::lost();
        }

        if self.is_online() {
            match self.remote.write(&self.collection, &record).await {
                Ok(()) => {
                    debug!(exercise = %record.exercise_id, "Recorded remotely");
                    return WriteOutcome::remote();
                }
                Err(e) => {
                    warn!(error = %e, "Remote write failed, saving locally");
                }
            }
        }

        let outcome = self.save_locally(record);
        self.publish_status();
        outcome
    }

    fn save_locally(&self, record: NewTrainingRecord) -> WriteOutcome {
        let mut overflow = self.lock_overflow();
        // Buffered records are older and must reach the queue first
        self.flush_overflow_locked(&mut overflow);

        if overflow.is_empty() {
            match self.queue.append(&record) {
                Ok(id) => {
                    debug!(record_id = id, "Saved record locally");
                    return WriteOutcome::local();
                }
                Err(e) => warn!(error = %e, "Local queue unavailable"),
            }
        }

        if overflow.len() < self.overflow_capacity {
            overflow.push_back(record);
            warn!(buffered = overflow.len(), "Holding record in memory");
            WriteOutcome::local()
        } else {
            error!(
                exercise = %record.exercise_id,
                created_at = %record.created_at,
                buffered = overflow.len(),
                "Overflow buffer full, record lost"
            );
            WriteOutcome::lost()
        }
    }

    /// Push every pending record to the remote store, oldest first.
    pub async fn drain(&self) -> DrainOutcome {
        if !self.is_online() {
            debug!("Drain skipped: offline");
            self.publish_status();
            return DrainOutcome::Offline;
        }

        let guard = match self.drain_lock.try_lock() {
            Ok(lock) => {
                self.draining.store(true, Ordering::SeqCst);
                DrainGuard {
                    _lock: lock,
                    draining: &self.draining,
                }
            }
            Err(_) => {
                debug!("Drain skipped: already in progress");
                self.publish_status();
                return DrainOutcome::AlreadyDraining;
            }
        };
        self.publish_status();

        let report = self.drain_pending().await;

        drop(guard);
        self.publish_status();
        DrainOutcome::Completed(report)
    }

    async fn drain_pending(&self) -> DrainReport {
        self.flush_overflow();

        let mut read_failed = false;
        let pending = self.queue.list_pending().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read pending records");
            read_failed = true;
            Vec::new()
        });

        let mut report = DrainReport {
            attempted: pending.len(),
            read_failed,
            ..DrainReport::default()
        };
        if !pending.is_empty() {
            info!(pending = pending.len(), "Draining local queue");
        }

        // Sequential on purpose: record N+1 waits for record N's outcome
        for record in pending {
            match self.remote.write(&self.collection, &record.record).await {
                Ok(()) => {
                    report.synced += 1;
                    if let Err(e) = self.queue.mark_synced(record.id) {
                        warn!(record_id = record.id, error = %e, "Failed to mark record synced, it will be sent again");
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(record_id = record.id, error = %e, "Remote write failed, record stays pending");
                }
            }
        }

        if report.synced > 0 {
            match self.queue.compact() {
                Ok(removed) => debug!(removed, "Compacted synced records"),
                Err(e) => warn!(error = %e, "Compaction failed"),
            }
        }

        report.remaining = self.pending_count();
        if report.attempted > 0 {
            info!(
                synced = report.synced,
                failed = report.failed,
                remaining = report.remaining,
                "Drain complete"
            );
        }
        report
    }

    fn flush_overflow(&self) {
        let mut overflow = self.lock_overflow();
        self.flush_overflow_locked(&mut overflow);
    }

    /// Move buffered records into the queue, keeping their order. Stops at
    /// the first record the queue still refuses.
    fn flush_overflow_locked(&self, overflow: &mut VecDeque<NewTrainingRecord>) {
        while let Some(record) = overflow.front() {
            match self.queue.append(record) {
                Ok(id) => {
                    debug!(record_id = id, "Moved buffered record into queue");
                    overflow.pop_front();
                }
                Err(e) => {
                    warn!(buffered = overflow.len(), error = %e, "Local queue still unavailable");
                    break;
                }
            }
        }
    }

    fn overflow_len(&self) -> usize {
        self.lock_overflow().len()
    }

    fn lock_overflow(&self) -> std::sync::MutexGuard<'_, VecDeque<NewTrainingRecord>> {
        self.overflow
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// User-initiated "sync now".
    pub async fn manual_sync(&self) -> ManualSyncOutcome {
        let outcome = ManualSyncOutcome::from(self.drain().await);
        info!(success = outcome.success, message = %outcome.message, "Manual sync");
        outcome
    }

    /// Apply a connectivity notification. Going online drains the queue and
    /// returns that drain's outcome; repeated values are ignored.
    pub async fn handle_connectivity_change(&self, connected: bool) -> Option<DrainOutcome> {
        let was_online = self.online.swap(connected, Ordering::SeqCst);
        match (was_online, connected) {
            (false, true) => {
                info!("Connectivity restored");
                self.publish_status();
                Some(self.drain().await)
            }
            (true, false) => {
                info!("Connectivity lost, writes will be queued locally");
                self.publish_status();
                None
            }
            _ => None,
        }
    }
}

/// Running connectivity subscription. Shutting it down (or dropping it)
/// unsubscribes the coordinator.
pub struct SyncHandle {
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!("Sync coordinator stopped");
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::schema;
    use crate::remote::MockRemoteStore;

    fn coordinator(remote: Arc<MockRemoteStore>, overflow_capacity: usize) -> SyncCoordinator {
        let queue = Arc::new(LocalQueue::open_in_memory().unwrap());
        let config = SyncConfig {
            collection: "training_records".to_string(),
            overflow_capacity,
        };
        SyncCoordinator::new(queue, remote, &config)
    }

    fn request(exercise_id: &str) -> WriteRequest {
        WriteRequest {
            user_id: "member-1".into(),
            routine_id: "routine-a".into(),
            exercise_id: exercise_id.into(),
            exercise_name: format!("Exercise {}", exercise_id),
            series: 3,
            reps: 10,
            weight: 20.0,
        }
    }

    fn break_queue(queue: &LocalQueue) {
        queue
            .with_conn(|conn| Ok(conn.execute_batch("DROP TABLE training_records")?))
            .unwrap();
    }

    fn repair_queue(queue: &LocalQueue) {
        queue.with_conn(schema::create_tables).unwrap();
    }

    #[tokio::test]
    async fn test_broken_queue_falls_back_to_overflow() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote.clone(), 4);
        break_queue(sync.queue());

        let outcome = sync.record_write(request("a")).await;
        assert_eq!(outcome, WriteOutcome::local());
        assert_eq!(sync.pending_count(), 1);

        // Storage comes back before connectivity does
        repair_queue(sync.queue());
        sync.handle_connectivity_change(true).await;

        assert_eq!(remote.written_exercises(), vec!["a"]);
        assert_eq!(sync.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_full_overflow_reports_loss() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote, 1);
        break_queue(sync.queue());

        assert!(sync.record_write(request("a")).await.success);
        assert_eq!(sync.record_write(request("b")).await, WriteOutcome::lost());
        assert_eq!(sync.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_overflow_kept_while_queue_stays_broken() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote.clone(), 4);
        break_queue(sync.queue());
        sync.record_write(request("a")).await;

        let outcome = sync.handle_connectivity_change(true).await.unwrap();
        let report = outcome.report().copied().unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.remaining, 1);
        assert!(report.read_failed);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_buffered_record_stays_ahead_of_later_writes() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote.clone(), 4);
        break_queue(sync.queue());
        sync.record_write(request("first")).await;

        repair_queue(sync.queue());
        assert_eq!(sync.record_write(request("second")).await, WriteOutcome::local());

        let queued: Vec<String> = sync
            .queue()
            .list_pending()
            .unwrap()
            .into_iter()
            .map(|r| r.record.exercise_id)
            .collect();
        assert_eq!(queued, vec!["first", "second"]);
        assert_eq!(sync.overflow_len(), 0);

        let report = sync.handle_connectivity_change(true).await.unwrap();
        assert!(!report.report().unwrap().read_failed);
        assert_eq!(remote.written_exercises(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_write_queues_behind_stuck_overflow() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote, 4);
        break_queue(sync.queue());

        sync.record_write(request("a")).await;
        assert_eq!(sync.record_write(request("b")).await, WriteOutcome::local());
        assert_eq!(sync.overflow_len(), 2);
        assert_eq!(sync.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_stored() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote.clone(), 4);
        let mut bad = request("a");
        bad.weight = -5.0;

        assert_eq!(sync.record_write(bad).await, WriteOutcome::lost());
        assert_eq!(sync.pending_count(), 0);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_state_tracks_connectivity() {
        let remote = Arc::new(MockRemoteStore::new());
        let sync = coordinator(remote, 4);
        assert_eq!(sync.state(), ConnectionState::Offline);

        sync.handle_connectivity_change(true).await;
        assert_eq!(sync.state(), ConnectionState::OnlineIdle);

        assert!(sync.handle_connectivity_change(true).await.is_none());
        sync.handle_connectivity_change(false).await;
        assert_eq!(sync.state(), ConnectionState::Offline);
    }
}
