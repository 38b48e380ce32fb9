//! Sync layer
//!
//! Handles:
//! - Routing writes to the remote store or the local queue
//! - Draining the queue when connectivity returns
//! - Publishing status snapshots to observers

pub mod coordinator;
pub mod outcome;
pub mod status;

// Re-exports
pub use coordinator::{SyncCoordinator, SyncHandle};
pub use outcome::{DrainOutcome, DrainReport, ManualSyncOutcome, WriteOutcome, WriteRequest};
pub use status::{ConnectionState, ObserverId, SyncStatus};
