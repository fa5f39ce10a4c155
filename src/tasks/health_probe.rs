use std::time::Duration;

use reqwest::Client;
use tokio::sync::broadcast;

use crate::config::{ApiConfig, NetworkConfig};
use crate::network::NetworkObserver;

/// Background task that turns `GET /health` results into connectivity events.
///
/// Publishes on the first check and then only when the result changes.
pub struct HealthProbe {
    client: Client,
    health_url: String,
    interval: Duration,
    observer: NetworkObserver,
    shutdown: broadcast::Receiver<()>,
}

impl HealthProbe {
    pub fn new(
        api: &ApiConfig,
        config: &NetworkConfig,
        observer: NetworkObserver,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.probe_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            health_url: format!("{}/health", api.base_url.trim_end_matches('/')),
            interval: Duration::from_millis(config.probe_interval_ms),
            observer,
            shutdown,
        })
    }

    /// Single health check; any 2xx counts as connected.
    pub async fn check(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, url = %self.health_url, "Health check failed");
                false
            }
        }
    }

    /// Run until the shutdown signal fires
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);
        let mut last: Option<bool> = None;

        tracing::info!(
            url = %self.health_url,
            interval_ms = self.interval.as_millis() as u64,
            "Health probe started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Health probe received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    let connected = self.check().await;
                    if last != Some(connected) {
                        tracing::info!(connected, "Connectivity changed");
                        self.observer.publish(connected);
                        last = Some(connected);
                    }
                }
            }
        }

        tracing::info!("Health probe stopped");
    }
}
