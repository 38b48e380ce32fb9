//! Connectivity observation
//!
//! The coordinator asks for the current state once at startup and then
//! follows a `watch` channel for the rest of its life. Dropping the receiver
//! unsubscribes.

pub mod manual;
pub mod probe;

pub use manual::ManualConnectivity;
pub use probe::ProbeConnectivity;

use async_trait::async_trait;
use tokio::sync::watch;

/// Source of online/offline transitions.
#[async_trait]
pub trait ConnectivityObserver: Send + Sync {
    /// Probe the network right now.
    async fn fetch_current_state(&self) -> bool;

    /// Receiver that sees every change of the connected flag.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
