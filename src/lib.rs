//! gym-sync: offline-first sync layer for the gym client
//!
//! Training records written while the device is offline (or while the
//! remote store is failing) are buffered in a local SQLite queue and drained
//! to the remote document store once connectivity returns.
//!
//! - `queue` - local durable queue (SQLite)
//! - `remote` - remote store contract and clients
//! - `connectivity` - connectivity observer contract and implementations
//! - `sync` - coordinator state machine and status fan-out

pub mod config;
pub mod connectivity;
pub mod error;
pub mod queue;
pub mod remote;
pub mod sync;

pub use config::Config;
pub use error::{ConfigError, QueueError, RemoteError};
pub use queue::{LocalQueue, NewTrainingRecord, SyncFlag, TrainingRecord};
pub use sync::{
    ConnectionState, DrainOutcome, DrainReport, ManualSyncOutcome, SyncCoordinator, SyncHandle,
    SyncStatus, WriteOutcome, WriteRequest,
};
