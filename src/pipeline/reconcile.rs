//! Startup reconciliation of store state against the container runtime.

use tracing::{error, info, warn};

use super::DeployerPipeline;
use crate::errors::CorvusError;
use crate::models::DeploymentStatus;

impl DeployerPipeline {
    /// Restore the live-status invariant after a restart: a row may say
    /// `live` while its container disappeared with the previous daemon
    /// state. Each live row is checked against the runtime and marked
    /// `failed` when its serving container is gone, so clients see the
    /// truth instead of a silently dead site.
    pub async fn reconcile_live_deployments(&self) -> Result<(), CorvusError> {
        let live = self.store.list_live().await?;
        if live.is_empty() {
            return Ok(());
        }

        info!(count = live.len(), "reconciling live deployments against runtime");

        for deployment in live {
            let container_name = deployment.server_container_name();
            match self.docker.container_running(&container_name).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        id = %deployment.id,
                        slug = %deployment.slug,
                        container_name = %container_name,
                        "live deployment has no running container, marking failed"
                    );
                    if let Err(e) = self
                        .store
                        .update_status(&deployment.id, DeploymentStatus::Failed)
                        .await
                    {
                        error!(id = %deployment.id, error = %e, "failed to mark deployment failed");
                    }
                }
                Err(e) => {
                    warn!(
                        id = %deployment.id,
                        slug = %deployment.slug,
                        error = %e,
                        "could not check container state, skipping"
                    );
                }
            }
        }

        Ok(())
    }
}
