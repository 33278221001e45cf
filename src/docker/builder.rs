//! Ephemeral build containers: one `sh -c "<build command>"` run over a
//! bind-mounted source directory, with the combined output captured into
//! the deployment log.

use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};

use super::cli::{stderr_text, DockerClient};
use crate::errors::CorvusError;

/// Image for build containers. node:20-alpine covers the common static
/// site generators (Vite, Next static export, Astro, Svelte) and the
/// npm/yarn/pnpm toolchains. A per-deployment build image is a later
/// addition; `BuildContainerSpec` is where it would slot in.
const BUILD_IMAGE: &str = "node:20-alpine";

/// Parameters for [`DockerClient::run_build_container`].
#[derive(Debug, Clone)]
pub struct BuildContainerSpec {
    /// Container name, by convention `build-<slug>`.
    pub container_name: String,

    /// Shell command executed via `sh -c`, so `&&`, pipes, and the rest of
    /// the user's one-liner are interpreted by the shell.
    pub build_command: String,

    /// Host directory with the staged source. Mounted read-write at
    /// /workspace so the build writes its output (dist/, build/, out/)
    /// back to the host for the publish step.
    pub host_source_dir: PathBuf,

    /// KEY=VALUE environment variables for the build process.
    pub env_vars: Vec<String>,
}

impl DockerClient {
    /// Run the user's build command in an ephemeral container and wait for
    /// it to exit.
    ///
    /// The container runs as the host process's uid:gid so every file the
    /// build writes is owned by this process and removing the working
    /// directory afterwards cannot fail on permissions. No proxy network
    /// is attached; builds get the default bridge only.
    ///
    /// A non-zero exit code returns `BuildFailed`, an ordinary outcome
    /// whose details are already in the log, while orchestration faults
    /// surface as runtime errors. The container is removed on every exit
    /// path, success or not.
    pub async fn run_build_container(
        &self,
        spec: &BuildContainerSpec,
        log_writer: &mut (dyn Write + Send),
    ) -> Result<(), CorvusError> {
        self.pull_image_if_missing(BUILD_IMAGE).await?;

        let source_dir = tokio::fs::canonicalize(&spec.host_source_dir)
            .await
            .map_err(|e| {
                CorvusError::ContainerCreate(format!(
                    "source directory {} not resolvable: {e}",
                    spec.host_source_dir.display()
                ))
            })?;

        let uid = nix::unistd::getuid();
        let gid = nix::unistd::getgid();

        let mount = format!("{}:/workspace", source_dir.display());
        let user = format!("{uid}:{gid}");
        let mut args: Vec<String> = vec![
            "create".to_string(),
            "--name".to_string(),
            spec.container_name.clone(),
            "-v".to_string(),
            mount,
            "-w".to_string(),
            "/workspace".to_string(),
            "--user".to_string(),
            user,
        ];
        for env in &spec.env_vars {
            args.push("-e".to_string());
            args.push(env.clone());
        }
        args.push(BUILD_IMAGE.to_string());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(spec.build_command.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let create = self.docker(&arg_refs).await?;
        if !create.status.success() {
            return Err(CorvusError::ContainerCreate(format!(
                "failed to create build container {:?}: {}",
                spec.container_name,
                stderr_text(&create)
            )));
        }

        info!(
            container_name = %spec.container_name,
            build_command = %spec.build_command,
            "build container created"
        );

        // From here the container exists and must be removed no matter how
        // the run goes; force-remove also covers a container left running
        // by a wait failure.
        let result = self.drive_build(&spec.container_name, log_writer).await;

        let remove = self.docker(&["rm", "--force", &spec.container_name]).await;
        match remove {
            Ok(output) if output.status.success() => {
                info!(container_name = %spec.container_name, "build container removed");
            }
            Ok(output) => {
                warn!(
                    container_name = %spec.container_name,
                    error = %stderr_text(&output),
                    "failed to remove build container (non-fatal)"
                );
            }
            Err(e) => {
                warn!(
                    container_name = %spec.container_name,
                    error = %e,
                    "failed to remove build container (non-fatal)"
                );
            }
        }

        result
    }

    async fn drive_build(
        &self,
        container_name: &str,
        log_writer: &mut (dyn Write + Send),
    ) -> Result<(), CorvusError> {
        let start = self.docker(&["start", container_name]).await?;
        if !start.status.success() {
            return Err(CorvusError::ContainerStart(format!(
                "failed to start build container {container_name:?}: {}",
                stderr_text(&start)
            )));
        }

        // `docker wait` blocks until the container exits and prints the
        // exit code. Build times range from seconds to minutes, so there
        // is deliberately no deadline here.
        let wait = self.docker(&["wait", container_name]).await?;
        if !wait.status.success() {
            return Err(CorvusError::Runtime(format!(
                "error waiting for build container {container_name:?}: {}",
                stderr_text(&wait)
            )));
        }
        let exit_code: i64 = String::from_utf8_lossy(&wait.stdout)
            .trim()
            .parse()
            .map_err(|e| {
                CorvusError::Runtime(format!("unparseable exit code from docker wait: {e}"))
            })?;

        info!(container_name, exit_code, "build container exited");

        // Logs are read after exit so all output is flushed. Routing
        // stderr into stdout at the shell level keeps the two streams in
        // chronological order in the deployment log. A log capture failure
        // costs the user their build output but not the deployment.
        let logs_cmd = format!("docker logs {container_name} 2>&1");
        match tokio::process::Command::new("sh")
            .args(["-c", &logs_cmd])
            .output()
            .await
        {
            Ok(output) => {
                if let Err(e) = log_writer.write_all(&output.stdout) {
                    warn!(container_name, error = %e, "failed to write build logs (non-fatal)");
                }
            }
            Err(e) => {
                warn!(container_name, error = %e, "failed to read build container logs (non-fatal)");
            }
        }

        if exit_code != 0 {
            return Err(CorvusError::BuildFailed { code: exit_code });
        }

        Ok(())
    }
}
