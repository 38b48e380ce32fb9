//! Training record types stored in the local queue

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Sync state of a queued record, stored as an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncFlag {
    /// Not yet confirmed by the remote store (`0`)
    Pending,
    /// Confirmed by the remote store, eligible for compaction (`1`)
    Synced,
}

impl SyncFlag {
    pub fn as_i64(self) -> i64 {
        match self {
            SyncFlag::Pending => 0,
            SyncFlag::Synced => 1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            SyncFlag::Pending
        } else {
            SyncFlag::Synced
        }
    }
}

/// A training record before the queue has assigned it an id.
///
/// Serializes to the remote document shape (camelCase keys, no local id or
/// sync flag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrainingRecord {
    pub user_id: String,
    pub routine_id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    pub series: u32,
    pub reps: u32,
    pub weight: f64,
    /// RFC 3339 timestamp from the client clock. Never used for ordering.
    pub created_at: String,
}

impl NewTrainingRecord {
    /// Build a record stamped with the current UTC time.
    pub fn now(
        user_id: impl Into<String>,
        routine_id: impl Into<String>,
        exercise_id: impl Into<String>,
        exercise_name: impl Into<String>,
        series: u32,
        reps: u32,
        weight: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            routine_id: routine_id.into(),
            exercise_id: exercise_id.into(),
            exercise_name: exercise_name.into(),
            series,
            reps,
            weight,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.user_id.trim().is_empty() {
            return Err(QueueError::InvalidRecord("user_id is empty".into()));
        }
        if self.routine_id.trim().is_empty() {
            return Err(QueueError::InvalidRecord("routine_id is empty".into()));
        }
        if self.exercise_id.trim().is_empty() {
            return Err(QueueError::InvalidRecord("exercise_id is empty".into()));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(QueueError::InvalidRecord(format!(
                "weight must be a non-negative number, got {}",
                self.weight
            )));
        }
        Ok(())
    }
}

/// A record as stored in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: NewTrainingRecord,
    pub sync_flag: SyncFlag,
}

impl TrainingRecord {
    pub fn is_pending(&self) -> bool {
        self.sync_flag == SyncFlag::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_shape_is_camel_case() {
        let record = NewTrainingRecord::now("u-1", "r-1", "e-1", "Bench press", 4, 8, 60.0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["exerciseName"], "Bench press");
        assert_eq!(json["reps"], 8);
        assert!(json.get("id").is_none());
        assert!(json.get("synced").is_none());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let record = NewTrainingRecord::now("u-1", "r-1", "e-1", "Squat", 3, 5, -2.5);
        assert!(matches!(record.validate(), Err(QueueError::InvalidRecord(_))));

        let record = NewTrainingRecord::now("u-1", "r-1", "e-1", "Squat", 3, 5, f64::NAN);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_zero_weight_allowed() {
        let record = NewTrainingRecord::now("u-1", "r-1", "e-1", "Pull-up", 3, 10, 0.0);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_sync_flag_integer_mapping() {
        assert_eq!(SyncFlag::Pending.as_i64(), 0);
        assert_eq!(SyncFlag::Synced.as_i64(), 1);
        assert_eq!(SyncFlag::from_i64(0), SyncFlag::Pending);
        assert_eq!(SyncFlag::from_i64(1), SyncFlag::Synced);
    }
}
