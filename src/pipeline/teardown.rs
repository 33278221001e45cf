//! Full deployment teardown, shared by explicit deletion and the
//! expiration reaper.

use tracing::{info, warn};

use super::DeployerPipeline;
use crate::errors::CorvusError;
use crate::models::Deployment;

impl DeployerPipeline {
    /// Tear a deployment down completely: stop the serving container,
    /// remove the asset directory, remove the log file, delete the row.
    ///
    /// The row goes last, so a failure in any earlier step leaves it in
    /// place and the whole sequence can be retried, since every step is
    /// idempotent. Container and file removal failures are fatal to the
    /// caller; a leftover log file is not.
    pub async fn teardown_deployment(&self, deployment: &Deployment) -> Result<(), CorvusError> {
        self.docker
            .stop_and_remove(&deployment.server_container_name())
            .await?;

        let asset_dir = self.asset_dir(&deployment.slug);
        match tokio::fs::remove_dir_all(&asset_dir).await {
            Ok(()) => {
                info!(path = %asset_dir.display(), "deployment files removed");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let log_path = self.log_path(&deployment.slug);
        match tokio::fs::remove_file(&log_path).await {
            Ok(()) => {
                info!(path = %log_path.display(), "deployment log file removed");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    slug = %deployment.slug,
                    error = %e,
                    "failed to remove log file (non-fatal)"
                );
            }
        }

        self.store.delete(&deployment.id).await?;
        Ok(())
    }
}
