//! Dispatch surface: the boundary between the HTTP layer and the
//! deployment pipeline.
//!
//! Every operation here is synchronous from the caller's point of view:
//! the initial row is written (or fetched) and the pipeline is launched on
//! its own task before the call returns. Nothing waits for a pipeline;
//! clients observe progress through subsequent gets.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::errors::CorvusError;
use crate::models::{Deployment, DeploymentStatus, SourceSpec};
use crate::pipeline::DeployerPipeline;
use crate::store::Store;
use crate::util::slug::{generate_slug, generate_webhook_secret};

/// Caller-supplied fields for a new deployment.
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub name: String,
    pub source: SourceSpec,
    pub build_command: String,
    pub output_directory: String,
    pub env_vars: Option<BTreeMap<String, String>>,
    pub auto_deploy: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Store,
    pipeline: Arc<DeployerPipeline>,
    base_domain: String,
}

impl Dispatcher {
    pub fn new(store: Store, pipeline: Arc<DeployerPipeline>, base_domain: String) -> Self {
        Self {
            store,
            pipeline,
            base_domain,
        }
    }

    /// Create a github deployment: insert the initial row and launch the
    /// clone/build/publish pipeline. Returns the row with status
    /// `deploying`.
    pub async fn create_from_git(&self, request: NewDeployment) -> Result<Deployment, CorvusError> {
        match &request.source {
            SourceSpec::GitHub { url, .. } if !url.is_empty() => {}
            SourceSpec::GitHub { .. } => {
                return Err(CorvusError::InvalidRequest(
                    "github_url is required when source_type is 'github'".to_string(),
                ))
            }
            SourceSpec::Zip => {
                return Err(CorvusError::InvalidRequest(
                    "zip deployments must be created from an upload".to_string(),
                ))
            }
        }

        let deployment = self.insert_record(request).await?;

        let pipeline = Arc::clone(&self.pipeline);
        let job = deployment.clone();
        tokio::spawn(async move {
            pipeline.deploy_github(job).await;
        });

        Ok(deployment)
    }

    /// Create a zip deployment from an upload already spooled to
    /// `archive_path`. Ownership of the archive transfers to the pipeline
    /// task, which removes it after extraction.
    pub async fn create_from_zip(
        &self,
        request: NewDeployment,
        archive_path: PathBuf,
    ) -> Result<Deployment, CorvusError> {
        if !matches!(request.source, SourceSpec::Zip) {
            return Err(CorvusError::InvalidRequest(
                "source_type must be 'zip' for an upload deployment".to_string(),
            ));
        }

        let deployment = self.insert_record(request).await?;

        let pipeline = Arc::clone(&self.pipeline);
        let job = deployment.clone();
        tokio::spawn(async move {
            pipeline.deploy_zip_upload(job, archive_path).await;
        });

        Ok(deployment)
    }

    /// Redeploy an existing deployment. Github sources re-run the full
    /// clone/build pipeline; zip sources replace the container over the
    /// assets already on disk. Returns the row refreshed to `deploying`.
    pub async fn redeploy(&self, id: &str) -> Result<Deployment, CorvusError> {
        let deployment = self.store.get(id).await?;

        self.store
            .update_status(id, DeploymentStatus::Deploying)
            .await?;
        let refreshed = self.store.get(id).await?;

        let pipeline = Arc::clone(&self.pipeline);
        let job = refreshed.clone();
        match refreshed.source {
            SourceSpec::GitHub { .. } => {
                tokio::spawn(async move {
                    pipeline.deploy_github(job).await;
                });
            }
            SourceSpec::Zip => {
                tokio::spawn(async move {
                    pipeline.redeploy_existing_zip(job).await;
                });
            }
        }

        info!(id = %deployment.id, slug = %deployment.slug, "redeploy dispatched");
        Ok(refreshed)
    }

    /// Delete a deployment: full teardown through the shared coordinator.
    pub async fn delete(&self, id: &str) -> Result<(), CorvusError> {
        let deployment = self.store.get(id).await?;
        self.pipeline.teardown_deployment(&deployment).await
    }

    async fn insert_record(&self, request: NewDeployment) -> Result<Deployment, CorvusError> {
        if request.name.is_empty() {
            return Err(CorvusError::InvalidRequest("name is required".to_string()));
        }

        let env_vars = match &request.env_vars {
            Some(map) if !map.is_empty() => Some(serde_json::to_string(map)?),
            _ => None,
        };

        let id = Uuid::new_v4().to_string();
        let slug = generate_slug();

        // The URL is deterministic from the slug, so the client learns the
        // public address before the container exists.
        let url = format!("http://{slug}.{}", self.base_domain);

        let mut deployment = Deployment {
            id,
            slug,
            name: request.name,
            source: request.source,
            build_command: request.build_command,
            output_directory: request.output_directory,
            env_vars,
            status: DeploymentStatus::Deploying,
            url,
            webhook_secret: generate_webhook_secret(),
            auto_deploy: request.auto_deploy,
            expires_at: request.expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.store.insert(&mut deployment).await?;

        info!(
            id = %deployment.id,
            slug = %deployment.slug,
            source_type = deployment.source.kind(),
            name = %deployment.name,
            "deployment created"
        );

        Ok(deployment)
    }
}
