//! Zip deployment pipelines: fresh deploy from an uploaded archive, and
//! redeploy over assets already on disk.

use std::path::Path;

use tracing::{error, warn};

use super::{DeployerPipeline, PipelineLogger};
use crate::errors::CorvusError;
use crate::models::{Deployment, DeploymentStatus};
use crate::source::zip::extract_zip;

impl DeployerPipeline {
    /// Run the full zip pipeline for a deployment. Spawned on its own task
    /// by the dispatcher; the HTTP request has already returned by the
    /// time this runs.
    ///
    /// The pipeline owns `archive_path` (the spooled upload) and the
    /// working directory; both are removed on every exit path, success or
    /// failure.
    pub async fn deploy_zip_upload(&self, deployment: Deployment, archive_path: std::path::PathBuf) {
        let log_file = match self.open_log_file(&deployment.slug) {
            Ok(file) => Some(file),
            Err(e) => {
                // Not fatal: the pipeline continues on the structured
                // logger alone rather than failing a deployment over a
                // logging problem.
                error!(slug = %deployment.slug, error = %e, "failed to open deployment log file");
                None
            }
        };
        let mut log = PipelineLogger::new(self.store.clone(), &deployment, log_file);

        log.info(format!(
            "pipeline started for zip deployment {:?} (slug: {})",
            deployment.name, deployment.slug
        ));

        let work_dir = Self::work_dir(&deployment.id);
        self.run_zip_steps(&deployment, &archive_path, &work_dir, &mut log)
            .await;

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %archive_path.display(), error = %e, "failed to remove upload archive (non-fatal)");
            }
        }
        remove_work_dir(&work_dir).await;
    }

    async fn run_zip_steps(
        &self,
        deployment: &Deployment,
        archive_path: &Path,
        work_dir: &Path,
        log: &mut PipelineLogger,
    ) {
        // Status was set to deploying at record creation; writing it again
        // covers the redeploy case where a prior run left live or failed.
        if let Err(e) = self
            .store
            .update_status(&deployment.id, DeploymentStatus::Deploying)
            .await
        {
            log.fail("failed to update status to deploying", &e).await;
            return;
        }

        log.info(format!(
            "extracting zip to working directory: {}",
            work_dir.display()
        ));
        let archive = archive_path.to_owned();
        let dest = work_dir.to_owned();
        let extracted = tokio::task::spawn_blocking(move || extract_zip(&archive, &dest))
            .await
            .unwrap_or_else(|e| Err(CorvusError::Runtime(format!("extract task failed: {e}"))));
        if let Err(e) = extracted {
            log.fail("failed to extract zip archive", &e).await;
            return;
        }
        log.info("zip extracted successfully");

        self.publish(deployment, work_dir, log).await;
    }

    /// Re-create the serving container for an existing zip deployment from
    /// the files already in the asset root. The original upload is not
    /// retained, so there is nothing to re-extract; if the asset directory
    /// is gone the row cannot be redeployed this way.
    pub async fn redeploy_existing_zip(&self, deployment: Deployment) {
        let log_file = match self.open_log_file(&deployment.slug) {
            Ok(file) => Some(file),
            Err(e) => {
                error!(slug = %deployment.slug, error = %e, "failed to open deployment log file for redeploy");
                None
            }
        };
        let mut log = PipelineLogger::new(self.store.clone(), &deployment, log_file);

        log.info(format!(
            "redeploy started for deployment {:?} (slug: {})",
            deployment.name, deployment.slug
        ));

        if let Err(e) = self
            .store
            .update_status(&deployment.id, DeploymentStatus::Deploying)
            .await
        {
            log.fail("failed to update status to deploying", &e).await;
            return;
        }

        let asset_dir = self.asset_dir(&deployment.slug);
        match tokio::fs::metadata(&asset_dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                let err = CorvusError::AssetsMissing(asset_dir.display().to_string());
                log.fail("deployment files not found on disk, cannot redeploy", &err)
                    .await;
                return;
            }
        }

        self.replace_container_and_mark_live(&deployment, &mut log)
            .await;
    }
}

pub(crate) async fn remove_work_dir(work_dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(work_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %work_dir.display(), error = %e, "failed to remove temp build directory (non-fatal)");
        }
    }
}
