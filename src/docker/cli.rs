//! Docker CLI plumbing: process invocation, daemon ping, image pulls, and
//! exact-name container lookup.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::CorvusError;

/// Client for the local Docker daemon. Safe to share across tasks: every
/// operation is an independent CLI invocation, and the daemon serializes
/// state changes itself.
#[derive(Debug, Clone)]
pub struct DockerClient;

impl DockerClient {
    /// Connect to the Docker daemon and verify it is reachable.
    ///
    /// The ping runs under a 5-second deadline; a local socket answers in
    /// milliseconds, so anything slower means the daemon is down or hung.
    /// Failing here makes the process exit at startup rather than on the
    /// first deployment.
    pub async fn connect() -> Result<Self, CorvusError> {
        let ping = tokio::time::timeout(
            Duration::from_secs(5),
            Command::new("docker")
                .args(["version", "--format", "{{.Server.Version}}"])
                .output(),
        )
        .await;

        let output = match ping {
            Err(_) => {
                return Err(CorvusError::RuntimeUnreachable(
                    "ping timed out after 5s".to_string(),
                ))
            }
            Ok(Err(e)) => return Err(CorvusError::RuntimeUnreachable(e.to_string())),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(CorvusError::RuntimeUnreachable(stderr_text(&output)));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(server_version = %version, "docker daemon connected");
        Ok(Self)
    }

    /// Pull an image unless it is already in the local cache. Idempotent.
    ///
    /// `docker pull` exits only after the daemon has committed every layer,
    /// so a zero exit status means the image is ready for `create`.
    pub async fn pull_image_if_missing(&self, image: &str) -> Result<(), CorvusError> {
        let inspect = self.docker(&["image", "inspect", image]).await?;
        if inspect.status.success() {
            debug!(image, "image already present, skipping pull");
            return Ok(());
        }

        info!(image, "pulling docker image");
        let pull = self.docker(&["pull", image]).await?;
        if !pull.status.success() {
            return Err(CorvusError::ImagePull(format!(
                "failed to pull {image}: {}",
                stderr_text(&pull)
            )));
        }

        info!(image, "docker image pulled");
        Ok(())
    }

    /// Find a container by exact name. The CLI's name filter matches
    /// substrings ("deploy-amber-bay" also matches "deploy-amber-bay-2"),
    /// so the candidates are compared against the full name here.
    /// Returns None when no container with that exact name exists.
    pub(crate) async fn lookup_container(
        &self,
        name: &str,
        include_stopped: bool,
    ) -> Result<Option<String>, CorvusError> {
        let filter = format!("name={name}");
        let mut args = vec!["ps", "--format", "{{.Names}}", "--filter", filter.as_str()];
        if include_stopped {
            args.push("--all");
        }

        let output = self.docker(&args).await?;
        if !output.status.success() {
            return Err(CorvusError::Runtime(format!(
                "failed to list containers matching {name:?}: {}",
                stderr_text(&output)
            )));
        }

        let found = String::from_utf8_lossy(&output.stdout)
            .lines()
            .find(|line| line.trim() == name)
            .map(|line| line.trim().to_string());
        Ok(found)
    }

    /// True when a container with this exact name is currently running.
    /// Used by the startup reconciliation pass.
    pub async fn container_running(&self, name: &str) -> Result<bool, CorvusError> {
        Ok(self.lookup_container(name, false).await?.is_some())
    }

    /// Run a docker subcommand and capture its output. Only failures to
    /// spawn the process surface here; callers inspect the exit status.
    pub(crate) async fn docker(&self, args: &[&str]) -> Result<Output, CorvusError> {
        Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| {
                CorvusError::Runtime(format!(
                    "failed to run docker {}: {e}",
                    args.first().copied().unwrap_or_default()
                ))
            })
    }
}

pub(crate) fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
