//! Serving-container half of the runtime adapter: the long-lived nginx
//! container that makes a deployment reachable, and its teardown.

use std::path::PathBuf;

use tracing::{debug, info};

use super::cli::{stderr_text, DockerClient};
use crate::errors::CorvusError;

/// Image for every per-deployment web server. nginx:alpine is small,
/// has a minimal attack surface, and serves static files out of the box.
const NGINX_IMAGE: &str = "nginx:alpine";

/// Parameters for [`DockerClient::create_and_start_server`].
#[derive(Debug, Clone)]
pub struct ServerContainerSpec {
    /// Container name, by convention `deploy-<slug>`.
    pub container_name: String,

    /// Slug used to build the Traefik routing labels.
    pub slug: String,

    /// Host directory holding the published static files. Bind-mounted
    /// read-only at the nginx web root. Must exist before this call.
    pub host_asset_dir: PathBuf,

    /// Docker network shared with Traefik. Attached at create time, not
    /// after start: Traefik reacts to the start event instantly, and the
    /// container must already be routable when that happens.
    pub network: String,

    /// Domain suffix for the Host() routing rule.
    pub base_domain: String,
}

/// Container labels that make Traefik route `<slug>.<base_domain>` to this
/// container. Traefik watches the Docker socket and picks these up at
/// container start; no proxy config reload is involved. `traefik.enable`
/// is mandatory because the proxy runs with `exposedByDefault: false`.
pub fn traefik_labels(slug: &str, base_domain: &str) -> Vec<String> {
    vec![
        "traefik.enable=true".to_string(),
        format!("traefik.http.routers.{slug}.rule=Host(`{slug}.{base_domain}`)"),
        format!("traefik.http.services.{slug}.loadbalancer.server.port=80"),
    ]
}

impl DockerClient {
    /// Create and start the nginx serving container for a deployment.
    ///
    /// Once this returns Ok the site is reachable: Traefik has seen the
    /// start event and begun routing. The caller must have stopped any
    /// prior container with the same name; names are not serialized here.
    ///
    /// Restart policy is `unless-stopped` so deployments survive host
    /// reboots without an external process manager, while an explicit stop
    /// during teardown still sticks.
    pub async fn create_and_start_server(
        &self,
        spec: &ServerContainerSpec,
    ) -> Result<(), CorvusError> {
        self.pull_image_if_missing(NGINX_IMAGE).await?;

        // Docker requires an absolute host path for bind mounts.
        let asset_dir = tokio::fs::canonicalize(&spec.host_asset_dir)
            .await
            .map_err(|e| {
                CorvusError::ContainerCreate(format!(
                    "asset directory {} not resolvable: {e}",
                    spec.host_asset_dir.display()
                ))
            })?;

        let mount = format!("{}:/usr/share/nginx/html:ro", asset_dir.display());
        let mut args: Vec<String> = vec![
            "create".to_string(),
            "--name".to_string(),
            spec.container_name.clone(),
            "--network".to_string(),
            spec.network.clone(),
            "--restart".to_string(),
            "unless-stopped".to_string(),
            "-v".to_string(),
            mount,
        ];
        for label in traefik_labels(&spec.slug, &spec.base_domain) {
            args.push("--label".to_string());
            args.push(label);
        }
        args.push(NGINX_IMAGE.to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let create = self.docker(&arg_refs).await?;
        if !create.status.success() {
            return Err(CorvusError::ContainerCreate(format!(
                "failed to create container {:?}: {}",
                spec.container_name,
                stderr_text(&create)
            )));
        }

        let start = self.docker(&["start", &spec.container_name]).await?;
        if !start.status.success() {
            return Err(CorvusError::ContainerStart(format!(
                "failed to start container {:?}: {}",
                spec.container_name,
                stderr_text(&start)
            )));
        }

        info!(
            container_name = %spec.container_name,
            slug = %spec.slug,
            "serving container started"
        );
        Ok(())
    }

    /// Stop and remove a container by exact name, used before a redeploy
    /// replaces a container and when a deployment is deleted.
    ///
    /// A missing container is success: the desired state is already
    /// satisfied, which makes a partial teardown safe to retry. The stop
    /// sends the graceful signal with a 10-second window before the
    /// runtime escalates to SIGKILL.
    pub async fn stop_and_remove(&self, container_name: &str) -> Result<(), CorvusError> {
        let Some(name) = self.lookup_container(container_name, true).await? else {
            debug!(container_name, "container not found, nothing to remove");
            return Ok(());
        };

        let stop = self.docker(&["stop", "--time", "10", &name]).await?;
        if !stop.status.success() {
            return Err(CorvusError::Runtime(format!(
                "failed to stop container {name:?}: {}",
                stderr_text(&stop)
            )));
        }

        let remove = self.docker(&["rm", &name]).await?;
        if !remove.status.success() {
            return Err(CorvusError::Runtime(format!(
                "failed to remove container {name:?}: {}",
                stderr_text(&remove)
            )));
        }

        info!(container_name = %name, "container stopped and removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_route_slug_host_to_port_80() {
        let labels = traefik_labels("amber-ridge-3f9a", "localhost");
        assert_eq!(
            labels,
            vec![
                "traefik.enable=true",
                "traefik.http.routers.amber-ridge-3f9a.rule=Host(`amber-ridge-3f9a.localhost`)",
                "traefik.http.services.amber-ridge-3f9a.loadbalancer.server.port=80",
            ]
        );
    }
}
