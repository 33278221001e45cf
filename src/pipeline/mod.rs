//! Deployment pipeline orchestration.
//!
//! One `DeployerPipeline` is constructed at startup and shared behind an
//! `Arc`; each deploy, redeploy, teardown, or reaper pass borrows it. The
//! pipeline holds no per-deployment state; every run owns its inputs.

pub mod expiration;
mod github_deploy;
mod logger;
mod publish;
mod reconcile;
mod teardown;
mod zip_deploy;

use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::docker::DockerClient;
use crate::store::Store;

pub use logger::PipelineLogger;

/// Configuration slice the pipeline needs, mirrored from `AppConfig` so
/// this module does not depend on the config loader.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub asset_root: PathBuf,
    pub log_root: PathBuf,
    pub traefik_network: String,
    pub base_domain: String,
}

/// Dependencies for running deployments. Each pipeline invocation runs
/// independently on its own task.
pub struct DeployerPipeline {
    store: Store,
    docker: DockerClient,

    /// Base directory for published static files; each deployment owns
    /// `<asset_root>/<slug>/`, bind-mounted into its serving container.
    asset_root: PathBuf,

    /// Base directory for per-deployment log files (`<log_root>/<slug>.log`).
    log_root: PathBuf,

    traefik_network: String,
    base_domain: String,
}

impl DeployerPipeline {
    pub fn new(store: Store, docker: DockerClient, config: PipelineConfig) -> Self {
        Self {
            store,
            docker,
            asset_root: config.asset_root,
            log_root: config.log_root,
            traefik_network: config.traefik_network,
            base_domain: config.base_domain,
        }
    }

    pub(crate) fn asset_dir(&self, slug: &str) -> PathBuf {
        self.asset_root.join(slug)
    }

    pub(crate) fn log_path(&self, slug: &str) -> PathBuf {
        self.log_root.join(format!("{slug}.log"))
    }

    /// Working directory for one pipeline run, removed on pipeline exit.
    pub(crate) fn work_dir(deployment_id: &str) -> PathBuf {
        std::env::temp_dir().join(format!("corvus-build-{deployment_id}"))
    }

    /// Open the deployment's log file in append-create mode. Redeploys
    /// append to the existing log rather than truncating, keeping the full
    /// deployment history in one file.
    pub(crate) fn open_log_file(&self, slug: &str) -> std::io::Result<std::fs::File> {
        std::fs::create_dir_all(&self.log_root)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(slug))
    }
}
