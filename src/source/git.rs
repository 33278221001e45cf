//! Git source staging via the system git binary.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::errors::CorvusError;

/// Clone a public repository into `dest_dir` with a shallow, single-branch
/// clone: `--depth 1` fetches only the latest commit, which is all the
/// pipeline needs.
///
/// `dest_dir` must not exist yet; git creates it. Clone progress goes to
/// the deployment log file when one is available (git writes progress to
/// stderr, stdout is routed along with it so nothing is dropped).
///
/// Any clone failure (invalid URL, missing branch, auth required,
/// network) surfaces as `CloneFailed`; the specific reason is in the log.
pub async fn clone_repository(
    url: &str,
    branch: &str,
    dest_dir: &Path,
    log_file: Option<&std::fs::File>,
) -> Result<(), CorvusError> {
    info!(url, branch, dest = %dest_dir.display(), "cloning repository");

    let mut command = Command::new("git");
    command.args([
        "clone",
        "--depth",
        "1",
        "--single-branch",
        "--branch",
        branch,
        url,
    ]);
    command.arg(dest_dir);

    match log_file.and_then(|f| f.try_clone().ok()) {
        Some(out) => {
            let err = out.try_clone().map_err(CorvusError::Io)?;
            command.stdout(Stdio::from(out));
            command.stderr(Stdio::from(err));
        }
        None => {
            command.stdout(Stdio::null());
            command.stderr(Stdio::null());
        }
    }

    let status = command
        .status()
        .await
        .map_err(|e| CorvusError::CloneFailed(format!("failed to run git: {e}")))?;

    if !status.success() {
        return Err(CorvusError::CloneFailed(format!(
            "git clone failed for {url:?} (branch {branch:?})"
        )));
    }

    info!(url, branch, "clone complete");
    Ok(())
}
