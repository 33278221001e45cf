//! Deployment record and its enums.
//!
//! `Deployment` maps 1:1 to the `deployments` table and is the value passed
//! between the store, the pipeline, and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// The pipeline is actively running (staging, building, starting the container).
    Deploying,

    /// The serving container is running and the site is reachable.
    Live,

    /// The pipeline hit an error and did not complete.
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Live => "live",
            DeploymentStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deploying" => Ok(DeploymentStatus::Deploying),
            "live" => Ok(DeploymentStatus::Live),
            "failed" => Ok(DeploymentStatus::Failed),
            other => Err(format!("unknown deployment status: {other}")),
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the deployment's source files come from.
///
/// The discriminator owns the git-specific fields, so a github source
/// without a URL cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum SourceSpec {
    /// A user-uploaded zip of pre-built static files.
    Zip,

    /// A public GitHub repository cloned at deploy time.
    #[serde(rename = "github")]
    GitHub {
        #[serde(rename = "github_url")]
        url: String,

        #[serde(default = "default_branch")]
        branch: String,
    },
}

pub fn default_branch() -> String {
    "main".to_string()
}

impl SourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::Zip => "zip",
            SourceSpec::GitHub { .. } => "github",
        }
    }
}

/// One deployment attempt: one row in the store, at most one serving
/// container (`deploy-<slug>`) and one ephemeral build container
/// (`build-<slug>`) named after its slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// UUID v4 generated at creation time; primary key.
    pub id: String,

    /// URL-safe identifier of the form `<adjective>-<noun>-<4 hex>`.
    /// Unique across all deployments; the public URL derives from it.
    pub slug: String,

    /// Human-readable label assigned by the user.
    pub name: String,

    #[serde(flatten)]
    pub source: SourceSpec,

    /// Shell command run inside the build container before serving.
    /// Empty means no build step (pre-built static site).
    pub build_command: String,

    /// Directory inside the staged content holding the final static files.
    /// Defaults to "." (root of the archive or repo).
    pub output_directory: String,

    /// JSON-encoded key/value map of env vars passed to the build
    /// container, stored as a single string column. None means no env vars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<String>,

    pub status: DeploymentStatus,

    /// Fully qualified public URL, derived from the slug at creation time
    /// and immutable for the lifetime of the row.
    pub url: String,

    /// HMAC-SHA256 signing secret for push-triggered redeploys (64 hex
    /// chars). Generated once at creation, never mutated.
    pub webhook_secret: String,

    /// Whether a push to the configured branch triggers a rebuild.
    pub auto_deploy: bool,

    /// When the deployment is automatically torn down. None never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Set once at row insertion.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every status or URL update.
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Name of the long-lived serving container for this deployment.
    pub fn server_container_name(&self) -> String {
        format!("deploy-{}", self.slug)
    }

    /// Name of the ephemeral build container for this deployment.
    pub fn build_container_name(&self) -> String {
        format!("build-{}", self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_values() {
        for status in [
            DeploymentStatus::Deploying,
            DeploymentStatus::Live,
            DeploymentStatus::Failed,
        ] {
            let parsed: DeploymentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("typo".parse::<DeploymentStatus>().is_err());
    }

    #[test]
    fn source_spec_serializes_with_source_type_tag() {
        let zip = serde_json::to_value(&SourceSpec::Zip).unwrap();
        assert_eq!(zip["source_type"], "zip");

        let github = serde_json::to_value(&SourceSpec::GitHub {
            url: "https://github.com/example/site.git".to_string(),
            branch: "main".to_string(),
        })
        .unwrap();
        assert_eq!(github["source_type"], "github");
        assert_eq!(github["github_url"], "https://github.com/example/site.git");
    }

    #[test]
    fn github_source_branch_defaults_to_main() {
        let spec: SourceSpec = serde_json::from_str(
            r#"{"source_type":"github","github_url":"https://github.com/example/site.git"}"#,
        )
        .unwrap();
        match spec {
            SourceSpec::GitHub { branch, .. } => assert_eq!(branch, "main"),
            SourceSpec::Zip => panic!("expected github source"),
        }
    }

    #[test]
    fn container_names_are_prefixed_with_role() {
        let deployment = Deployment {
            id: "d1".to_string(),
            slug: "amber-ridge-3f9a".to_string(),
            name: "demo".to_string(),
            source: SourceSpec::Zip,
            build_command: String::new(),
            output_directory: ".".to_string(),
            env_vars: None,
            status: DeploymentStatus::Deploying,
            url: "http://amber-ridge-3f9a.localhost".to_string(),
            webhook_secret: "ab".repeat(32),
            auto_deploy: false,
            expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(deployment.server_container_name(), "deploy-amber-ridge-3f9a");
        assert_eq!(deployment.build_container_name(), "build-amber-ridge-3f9a");
    }
}
