//! Remote store abstraction layer.
//!
//! The remote document store is the system of record once a write is
//! confirmed. Implementations:
//! - HTTP document API
//! - Mock store for testing

pub mod http;
pub mod mock;

pub use http::HttpRemoteStore;
pub use mock::MockRemoteStore;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::queue::NewTrainingRecord;

/// Write-only view of the remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write one record into `collection`. Any error means the write was
    /// not confirmed.
    async fn write(&self, collection: &str, record: &NewTrainingRecord) -> Result<(), RemoteError>;
}
