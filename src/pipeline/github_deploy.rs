//! GitHub deployment pipeline: shallow clone, optional containerized
//! build, then the shared publish tail.

use std::path::Path;

use tracing::error;

use super::zip_deploy::remove_work_dir;
use super::{DeployerPipeline, PipelineLogger};
use crate::docker::BuildContainerSpec;
use crate::errors::CorvusError;
use crate::models::{Deployment, DeploymentStatus, SourceSpec};
use crate::source::git::clone_repository;
use crate::util::env_vars::decode_env_vars;

impl DeployerPipeline {
    /// Run the full github pipeline for a deployment. Used for both first
    /// deploys and redeploys: a redeploy re-clones and rebuilds, and the
    /// publish step refreshes the asset directory wholesale.
    pub async fn deploy_github(&self, deployment: Deployment) {
        let log_file = match self.open_log_file(&deployment.slug) {
            Ok(file) => Some(file),
            Err(e) => {
                error!(slug = %deployment.slug, error = %e, "failed to open deployment log file");
                None
            }
        };
        let mut log = PipelineLogger::new(self.store.clone(), &deployment, log_file);

        log.info("starting github deployment pipeline");

        let work_dir = Self::work_dir(&deployment.id);
        self.run_github_steps(&deployment, &work_dir, &mut log).await;
        remove_work_dir(&work_dir).await;
    }

    async fn run_github_steps(
        &self,
        deployment: &Deployment,
        work_dir: &Path,
        log: &mut PipelineLogger,
    ) {
        if let Err(e) = self
            .store
            .update_status(&deployment.id, DeploymentStatus::Deploying)
            .await
        {
            log.fail("failed to set status to deploying", &e).await;
            return;
        }

        let SourceSpec::GitHub { url, branch } = &deployment.source else {
            let err = CorvusError::InvalidRequest(format!(
                "deployment {} is not a github deployment",
                deployment.id
            ));
            log.fail("wrong source type for github pipeline", &err).await;
            return;
        };

        // git clone creates the destination itself; the path is generated
        // without touching the disk. A leftover directory from a crashed
        // run would make the clone refuse, so clear it first.
        remove_work_dir(work_dir).await;

        log.info(format!("cloning repository: {url} (branch: {branch})"));
        if let Err(e) = clone_repository(url, branch, work_dir, log.file()).await {
            log.fail("git clone failed", &e).await;
            return;
        }
        log.info("clone complete");

        if !deployment.build_command.is_empty() {
            log.info(format!("running build command: {}", deployment.build_command));

            let env_vars = match decode_env_vars(deployment.env_vars.as_deref()) {
                Ok(vars) => vars,
                Err(e) => {
                    log.fail("failed to decode environment variables", &e).await;
                    return;
                }
            };

            let spec = BuildContainerSpec {
                container_name: deployment.build_container_name(),
                build_command: deployment.build_command.clone(),
                host_source_dir: work_dir.to_owned(),
                env_vars,
            };

            let mut writer = log.output_writer();
            if let Err(e) = self.docker.run_build_container(&spec, writer.as_mut()).await {
                log.fail("build failed", &e).await;
                return;
            }
            log.info("build complete");
        } else {
            log.info("no build command specified, skipping build step");
        }

        self.publish(deployment, work_dir, log).await;
    }
}
