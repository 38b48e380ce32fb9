//! Mock remote store for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

use super::RemoteStore;
use crate::error::RemoteError;
use crate::queue::NewTrainingRecord;

/// Mock store with configurable failures.
///
/// Writes can fail globally (`with_available(false)`), per exercise id
/// (`fail_exercise`), or be held until released (`gated`).
pub struct MockRemoteStore {
    available: AtomicBool,
    failing_exercises: Mutex<HashSet<String>>,
    written: Mutex<Vec<(String, NewTrainingRecord)>>,
    call_count: AtomicU32,
    gate: Option<Semaphore>,
    entered: Notify,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            failing_exercises: Mutex::new(HashSet::new()),
            written: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
            gate: None,
            entered: Notify::new(),
        }
    }

    /// A store whose writes block until `release` hands out permits.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Reject every write of the given exercise id.
    pub fn fail_exercise(&self, exercise_id: impl Into<String>) {
        lock(&self.failing_exercises).insert(exercise_id.into());
    }

    pub fn clear_failures(&self) {
        lock(&self.failing_exercises).clear();
    }

    /// Let `n` held writes proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Wait until a write call has started.
    pub async fn wait_for_call(&self) {
        self.entered.notified().await;
    }

    /// Number of write attempts, successful or not.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Records confirmed so far, with their collection, in write order.
    pub fn written(&self) -> Vec<(String, NewTrainingRecord)> {
        lock(&self.written).clone()
    }

    pub fn written_exercises(&self) -> Vec<String> {
        lock(&self.written)
            .iter()
            .map(|(_, r)| r.exercise_id.clone())
            .collect()
    }
}

impl Default for MockRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn write(&self, collection: &str, record: &NewTrainingRecord) -> Result<(), RemoteError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| RemoteError::Unavailable(e.to_string()))?
                .forget();
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("Mock store disabled".to_string()));
        }
        if lock(&self.failing_exercises).contains(&record.exercise_id) {
            return Err(RemoteError::Rejected {
                status: 503,
                body: format!("mock failure for {}", record.exercise_id),
            });
        }

        lock(&self.written).push((collection.to_string(), record.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn record(exercise_id: &str) -> NewTrainingRecord {
        NewTrainingRecord::now("u", "r", exercise_id, "Deadlift", 5, 5, 100.0)
    }

    #[tokio::test]
    async fn test_mock_store() {
        let store = MockRemoteStore::new();
        store.write("training_records", &record("e-1")).await.unwrap();

        assert_eq!(store.call_count(), 1);
        assert_eq!(store.written_exercises(), vec!["e-1"]);
        assert_eq!(store.written()[0].0, "training_records");
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let store = MockRemoteStore::new().with_available(false);
        assert_err!(store.write("c", &record("e-1")).await);
        assert_eq!(store.call_count(), 1);
        assert!(store.written().is_empty());
    }

    #[tokio::test]
    async fn test_mock_selective_failure() {
        let store = MockRemoteStore::new();
        store.fail_exercise("e-2");
        assert_ok!(store.write("c", &record("e-1")).await);
        assert_err!(store.write("c", &record("e-2")).await);

        store.clear_failures();
        assert_ok!(store.write("c", &record("e-2")).await);
    }
}
