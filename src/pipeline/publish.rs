//! Shared publish tail: the steps identical for every source type once a
//! directory of static files exists.

use std::path::Path;

use tracing::error;

use super::{DeployerPipeline, PipelineLogger};
use crate::docker::ServerContainerSpec;
use crate::errors::CorvusError;
use crate::models::{Deployment, DeploymentStatus};
use crate::util::copy::copy_directory;

impl DeployerPipeline {
    /// Validate the output directory inside `content_root`, copy it to the
    /// asset root, replace the serving container, and mark the deployment
    /// live. Returns true when the deployment reached `live`. All logging
    /// and status updates happen internally.
    pub(crate) async fn publish(
        &self,
        deployment: &Deployment,
        content_root: &Path,
        log: &mut PipelineLogger,
    ) -> bool {
        // A wrong output_directory is the most common user error; catch it
        // here with a clear message instead of a confusing bind-mount
        // failure later. join() handles "." by yielding content_root.
        let output_dir = content_root.join(&deployment.output_directory);
        match tokio::fs::metadata(&output_dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) | Err(_) => {
                let err = CorvusError::OutputMissing(deployment.output_directory.clone());
                log.fail(
                    &format!(
                        "output directory {:?} not found in source content",
                        deployment.output_directory
                    ),
                    &err,
                )
                .await;
                return false;
            }
        }

        // Working directories are ephemeral; the asset root is the stable
        // location the serving container mounts, refreshed wholesale so
        // stale files never outlive a redeploy.
        let asset_dir = self.asset_dir(&deployment.slug);
        log.info(format!(
            "copying output directory to asset root: {} -> {}",
            output_dir.display(),
            asset_dir.display()
        ));

        let copy_src = output_dir.clone();
        let copy_dest = asset_dir.clone();
        let copied = tokio::task::spawn_blocking(move || copy_directory(&copy_src, &copy_dest))
            .await
            .unwrap_or_else(|e| Err(CorvusError::Runtime(format!("copy task failed: {e}"))));
        if let Err(e) = copied {
            log.fail("failed to copy output directory to asset root", &e)
                .await;
            return false;
        }
        log.info("files copied to asset root");

        self.replace_container_and_mark_live(deployment, log).await
    }

    /// Stop any existing container for the slug, start a fresh one over
    /// the asset directory, and transition the row to `live`. Shared by
    /// the publish tail and the zip-on-disk redeploy.
    pub(crate) async fn replace_container_and_mark_live(
        &self,
        deployment: &Deployment,
        log: &mut PipelineLogger,
    ) -> bool {
        let container_name = deployment.server_container_name();

        // A no-op for first deployments; on redeploy this replaces the
        // running container.
        log.info(format!(
            "stopping existing container if present: {container_name}"
        ));
        if let Err(e) = self.docker.stop_and_remove(&container_name).await {
            log.fail("failed to remove existing container", &e).await;
            return false;
        }

        log.info(format!("starting serving container: {container_name}"));
        let spec = ServerContainerSpec {
            container_name,
            slug: deployment.slug.clone(),
            host_asset_dir: self.asset_dir(&deployment.slug),
            network: self.traefik_network.clone(),
            base_domain: self.base_domain.clone(),
        };
        if let Err(e) = self.docker.create_and_start_server(&spec).await {
            log.fail("failed to start serving container", &e).await;
            return false;
        }
        log.info("serving container started");

        if let Err(e) = self
            .store
            .update_status(&deployment.id, DeploymentStatus::Live)
            .await
        {
            // The container is running but the row write failed. The site
            // is actually live, so tearing it down over a stale status row
            // would be worse than the inconsistency; record it and leave
            // the container alone.
            error!(
                id = %deployment.id,
                slug = %deployment.slug,
                error = %e,
                "container is live but failed to update status to live"
            );
            return false;
        }

        log.info(format!("deployment complete. site is live at {}", deployment.url));
        true
    }
}
