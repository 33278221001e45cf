//! Expiration reaper: tears down live deployments whose TTL has passed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info};

use super::DeployerPipeline;

/// Reaper worker options.
#[derive(Debug, Clone)]
pub struct Options {
    /// How often to scan for expired deployments. Removal latency is at
    /// most one tick.
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Run the reaper until the shutdown signal arrives. Launched once at
/// startup on its own task.
pub async fn run(
    options: &Options,
    pipeline: Arc<DeployerPipeline>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(interval = ?options.interval, "expiration reaper starting...");

    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("expiration reaper shutting down...");
                return;
            }
            _ = ticker.tick() => {
                reap_expired(&pipeline).await;
            }
        }
    }
}

/// One reaper pass: fetch expired live deployments and run the full
/// teardown for each. A failure on one deployment is logged and the loop
/// moves on; one bad row must not halt the reaper.
async fn reap_expired(pipeline: &DeployerPipeline) {
    let expired = match pipeline.store.list_expired_live().await {
        Ok(expired) => expired,
        Err(e) => {
            error!(error = %e, "failed to list expired deployments");
            return;
        }
    };

    if expired.is_empty() {
        return;
    }

    info!(count = expired.len(), "found expired deployments");

    for deployment in expired {
        info!(
            id = %deployment.id,
            slug = %deployment.slug,
            expires_at = ?deployment.expires_at,
            "cleaning up expired deployment"
        );

        if let Err(e) = pipeline.teardown_deployment(&deployment).await {
            error!(
                id = %deployment.id,
                slug = %deployment.slug,
                error = %e,
                "failed to tear down expired deployment"
            );
            continue;
        }

        info!(id = %deployment.id, slug = %deployment.slug, "expired deployment cleaned up");
    }
}
