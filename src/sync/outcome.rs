//! Request and result types of coordinator operations

use serde::{Deserialize, Serialize};

use crate::queue::NewTrainingRecord;

/// A training set to record for a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub user_id: String,
    pub routine_id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    pub series: u32,
    pub reps: u32,
    pub weight: f64,
}

impl WriteRequest {
    /// Stamp the request with the current time.
    pub fn into_record(self) -> NewTrainingRecord {
        NewTrainingRecord::now(
            self.user_id,
            self.routine_id,
            self.exercise_id,
            self.exercise_name,
            self.series,
            self.reps,
            self.weight,
        )
    }
}

/// Result of `record_write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub success: bool,
    /// The record is waiting in the local queue (or overflow buffer)
    pub saved_locally: bool,
}

impl WriteOutcome {
    pub fn remote() -> Self {
        Self { success: true, saved_locally: false }
    }

    pub fn local() -> Self {
        Self { success: true, saved_locally: true }
    }

    pub fn lost() -> Self {
        Self { success: false, saved_locally: false }
    }
}

/// Counts from one drain cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Pending records in the snapshot this drain walked
    pub attempted: usize,
    /// Records confirmed by the remote store
    pub synced: usize,
    /// Records the remote store rejected; still pending
    pub failed: usize,
    /// Pending count after the drain, overflow included
    pub remaining: u64,
    /// The pending snapshot could not be read from the queue
    pub read_failed: bool,
}

/// Result of `drain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// Rejected: no connectivity
    Offline,
    /// Rejected: another drain holds the guard
    AlreadyDraining,
}

impl DrainOutcome {
    pub fn success(&self) -> bool {
        matches!(self, DrainOutcome::Completed(_))
    }

    pub fn synced_count(&self) -> usize {
        match self {
            DrainOutcome::Completed(report) => report.synced,
            _ => 0,
        }
    }

    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// User-facing result of a "sync now" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualSyncOutcome {
    pub success: bool,
    pub message: String,
}

impl From<DrainOutcome> for ManualSyncOutcome {
    fn from(outcome: DrainOutcome) -> Self {
        match outcome {
            DrainOutcome::Offline => Self::failure(
                "No internet connection. Records will sync when you are back online.",
            ),
            DrainOutcome::AlreadyDraining => Self::failure("Sync already in progress"),
            DrainOutcome::Completed(report) => {
                if report.read_failed {
                    Self::failure(format!(
                        "{} could not be read from local storage",
                        records(report.remaining as usize)
                    ))
                } else if report.attempted == 0 && report.remaining == 0 {
                    Self::success("Nothing to sync")
                } else if report.attempted == 0 {
                    Self::failure(format!(
                        "{} still pending; will retry later",
                        records(report.remaining as usize)
                    ))
                } else if report.failed == 0 {
                    Self::success(format!("Synced {}", records(report.synced)))
                } else if report.synced > 0 {
                    Self::success(format!(
                        "Synced {}, {} still pending",
                        records(report.synced),
                        report.failed
                    ))
                } else {
                    Self::failure(format!(
                        "Could not sync {}; will retry later",
                        records(report.failed)
                    ))
                }
            }
        }
    }
}

impl ManualSyncOutcome {
    fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

fn records(n: usize) -> String {
    if n == 1 {
        "1 record".to_string()
    } else {
        format!("{} records", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(attempted: usize, synced: usize, failed: usize, remaining: u64) -> DrainOutcome {
        DrainOutcome::Completed(DrainReport {
            attempted,
            synced,
            failed,
            remaining,
            read_failed: false,
        })
    }

    #[test]
    fn test_manual_sync_messages() {
        let offline = ManualSyncOutcome::from(DrainOutcome::Offline);
        assert!(!offline.success);
        assert!(offline.message.contains("No internet"));

        let busy = ManualSyncOutcome::from(DrainOutcome::AlreadyDraining);
        assert!(!busy.success);
        assert!(busy.message.contains("already in progress"));

        let empty = ManualSyncOutcome::from(completed(0, 0, 0, 0));
        assert_eq!(empty, ManualSyncOutcome { success: true, message: "Nothing to sync".into() });

        let one = ManualSyncOutcome::from(completed(1, 1, 0, 0));
        assert_eq!(one.message, "Synced 1 record");

        let partial = ManualSyncOutcome::from(completed(3, 2, 1, 1));
        assert!(partial.success);
        assert_eq!(partial.message, "Synced 2 records, 1 still pending");

        let failed = ManualSyncOutcome::from(completed(2, 0, 2, 2));
        assert!(!failed.success);
    }

    #[test]
    fn test_unread_queue_message_needs_failed_read() {
        // Pending left over without a failed read is not a storage error
        let leftover = ManualSyncOutcome::from(completed(0, 0, 0, 1));
        assert!(!leftover.success);
        assert_eq!(leftover.message, "1 record still pending; will retry later");

        let unreadable = ManualSyncOutcome::from(DrainOutcome::Completed(DrainReport {
            remaining: 2,
            read_failed: true,
            ..DrainReport::default()
        }));
        assert!(!unreadable.success);
        assert_eq!(unreadable.message, "2 records could not be read from local storage");
    }

    #[test]
    fn test_drain_outcome_accessors() {
        assert!(!DrainOutcome::Offline.success());
        assert_eq!(DrainOutcome::AlreadyDraining.synced_count(), 0);
        assert_eq!(completed(3, 2, 1, 1).synced_count(), 2);
        assert!(completed(0, 0, 0, 0).report().is_some());
    }
}
