//! HTTP reachability probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::ConnectivityObserver;
use crate::config::Config;

/// Polls a health URL and reports online while it answers with 2xx.
pub struct ProbeConnectivity {
    client: Client,
    probe_url: String,
    interval: Duration,
    tx: watch::Sender<bool>,
}

impl ProbeConnectivity {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.remote_timeout()).build()?;
        let (tx, _rx) = watch::channel(false);
        Ok(Self {
            client,
            probe_url: config.connectivity.probe_url.clone(),
            interval: config.probe_interval(),
            tx,
        })
    }

    async fn probe(&self) -> bool {
        match self.client.get(&self.probe_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %self.probe_url, error = %e, "Probe failed");
                false
            }
        }
    }

    fn publish(&self, connected: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            info!(connected, url = %self.probe_url, "Connectivity changed");
        }
    }

    /// Start polling in the background until the handle is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            loop {
                timer.tick().await;
                let connected = self.probe().await;
                self.publish(connected);
            }
        })
    }
}

#[async_trait]
impl ConnectivityObserver for ProbeConnectivity {
    async fn fetch_current_state(&self) -> bool {
        let connected = self.probe().await;
        self.publish(connected);
        connected
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_probe_reports_offline() {
        let mut config = Config::default();
        config.connectivity.probe_url = "http://127.0.0.1:9/health".to_string();
        config.remote.timeout_secs = 2;
        let probe = ProbeConnectivity::new(&config).unwrap();

        assert!(!probe.fetch_current_state().await);
        assert!(!*probe.subscribe().borrow());
    }

    #[test]
    fn test_new_reports_client_errors_as_reqwest() {
        let config = Config::default();
        let probe: Result<ProbeConnectivity, reqwest::Error> = ProbeConnectivity::new(&config);
        let probe = probe.unwrap();
        assert_eq!(probe.probe_url, config.connectivity.probe_url);
        assert!(!*probe.subscribe().borrow());
    }
}
