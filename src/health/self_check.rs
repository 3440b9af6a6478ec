//! Periodic self health check.
//!
//! Probes `GET /resource` on the service's own loopback address carrying the
//! internal secret and no user agent. A healthy reply proves the listener,
//! the admission bypass and the store all work end to end.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tokio::time;

use crate::admission::RESOURCE_COLLECTION;
use crate::config::{GateConfig, HealthCheckConfig};
use crate::observability::metrics;
use crate::security::bot::X_INTERNAL_SECRET;

/// Result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy(StatusCode),
    Unreachable,
}

impl ProbeOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::Unhealthy(_) => "unhealthy",
            ProbeOutcome::Unreachable => "unreachable",
        }
    }
}

pub struct SelfHealthCheck {
    client: reqwest::Client,
    url: String,
    secret: SecretString,
    config: HealthCheckConfig,
}

impl SelfHealthCheck {
    /// `None` when no internal secret is configured: without it the probe
    /// would be classified as a bot.
    pub fn from_config(
        config: &GateConfig,
        local_addr: SocketAddr,
    ) -> Result<Option<Self>, reqwest::Error> {
        let Some(secret) = config.deployment.internal_secret.as_deref() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.health_check.timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            url: format!("http://{}{}", loopback_target(local_addr), RESOURCE_COLLECTION),
            secret: SecretString::from(secret.to_string()),
            config: config.health_check.clone(),
        }))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a single probe and record its outcome.
    pub async fn probe_once(&self) -> ProbeOutcome {
        let result = self
            .client
            .get(&self.url)
            .header(X_INTERNAL_SECRET, self.secret.expose_secret())
            .send()
            .await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => ProbeOutcome::Healthy,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Self health check failed: non-success status");
                ProbeOutcome::Unhealthy(response.status())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Self health check failed: request error");
                ProbeOutcome::Unreachable
            }
        };

        metrics::record_self_check(outcome.as_str());
        outcome
    }

    /// Probe on a jittered interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.config.interval_secs,
            jitter = self.config.jitter_secs,
            url = %self.url,
            "Self health check starting"
        );

        loop {
            let delay = Duration::from_secs(self.config.interval_secs)
                + Duration::from_secs(fastrand::u64(0..=self.config.jitter_secs));

            tokio::select! {
                _ = time::sleep(delay) => {
                    if self.probe_once().await == ProbeOutcome::Healthy {
                        tracing::debug!("Self health check passed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Self health check received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// The listener may be bound to a wildcard address; probe it through loopback.
fn loopback_target(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(Ipv4Addr::LOCALHOST.into(), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(Ipv6Addr::LOCALHOST.into(), addr.port()),
        _ => addr,
    }
}
