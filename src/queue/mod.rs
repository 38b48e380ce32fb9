//! Local durable queue
//!
//! SQLite-backed buffer for training records that the remote store has not
//! confirmed yet. Records are read back in insertion (id) order, flipped to
//! synced once the remote write succeeds, and removed by compaction.

pub mod record;
pub mod schema;

pub use record::{NewTrainingRecord, SyncFlag, TrainingRecord};

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::QueueError;

const SELECT_COLUMNS: &str = "id, user_id, routine_id, exercise_id, exercise_name, \
     series, reps, weight, created_at, synced";

/// Durable queue of training records awaiting remote confirmation.
pub struct LocalQueue {
    conn: Mutex<Connection>,
}

impl LocalQueue {
    /// Open or create the queue database in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, QueueError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("queue.db");

        let conn = Connection::open(&db_path).map_err(|e| {
            QueueError::StorageUnavailable(format!("opening {}: {}", db_path.display(), e))
        })?;

        // WAL keeps readers off the writer's back
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::init_schema(&conn)?;

        info!(path = %db_path.display(), "Local queue opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory queue (for testing)
    pub fn open_in_memory() -> Result<Self, QueueError> {
        debug!("Opening in-memory queue");
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, QueueError>
    where
        F: FnOnce(&Connection) -> Result<T, QueueError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| QueueError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Append a record as pending and return its assigned id.
    pub fn append(&self, record: &NewTrainingRecord) -> Result<i64, QueueError> {
        record.validate()?;
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO training_records
                    (user_id, routine_id, exercise_id, exercise_name,
                     series, reps, weight, created_at, synced)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.user_id,
                    record.routine_id,
                    record.exercise_id,
                    record.exercise_name,
                    record.series,
                    record.reps,
                    record.weight,
                    record.created_at,
                    SyncFlag::Pending.as_i64(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(record_id = id, exercise = %record.exercise_name, "Queued record");
        Ok(id)
    }

    /// All pending records, oldest first. A fresh snapshot on every call.
    pub fn list_pending(&self) -> Result<Vec<TrainingRecord>, QueueError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM training_records WHERE synced = 0 ORDER BY id ASC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map([], row_to_record)?;
            let records = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<TrainingRecord>, QueueError> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    &format!("SELECT {} FROM training_records WHERE id = ?1", SELECT_COLUMNS),
                    [id],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Flip a record to synced. Returns `false` when nothing changed
    /// (unknown id or already synced).
    pub fn mark_synced(&self, id: i64) -> Result<bool, QueueError> {
        let changed = self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE training_records SET synced = 1 WHERE id = ?1 AND synced = 0",
                [id],
            )?;
            Ok(n > 0)
        })?;
        if changed {
            debug!(record_id = id, "Marked record synced");
        }
        Ok(changed)
    }

    pub fn count_pending(&self) -> Result<u64, QueueError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM training_records WHERE synced = 0",
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Delete synced rows. Pending rows are never touched.
    pub fn compact(&self) -> Result<usize, QueueError> {
        let removed = self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM training_records WHERE synced = 1", [])?;
            Ok(n)
        })?;
        debug!(removed, "Compacted queue");
        Ok(removed)
    }

    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        self.with_conn(|conn| {
            let (pending, synced): (i64, i64) = conn.query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN synced = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN synced = 1 THEN 1 ELSE 0 END), 0)
                 FROM training_records",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(QueueStats {
                pending: pending as u64,
                synced: synced as u64,
                total: (pending + synced) as u64,
            })
        })
    }
}

/// Row counts for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub synced: u64,
    pub total: u64,
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TrainingRecord> {
    Ok(TrainingRecord {
        id: row.get(0)?,
        record: NewTrainingRecord {
            user_id: row.get(1)?,
            routine_id: row.get(2)?,
            exercise_id: row.get(3)?,
            exercise_name: row.get(4)?,
            series: row.get(5)?,
            reps: row.get(6)?,
            weight: row.get(7)?,
            created_at: row.get(8)?,
        },
        sync_flag: SyncFlag::from_i64(row.get(9)?),
    })
}
