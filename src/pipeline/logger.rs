//! Per-pipeline dual-sink logger.
//!
//! Every pipeline step is recorded twice: a structured record keyed by
//! slug for the process-wide logger, and a timestamped plain-text line in
//! the deployment's own log file. When the file could not be opened the
//! file sink degrades to a no-op (a logging failure never fails a
//! deployment), so call sites carry no conditionals.

use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};
use tracing::{error, info};

use crate::errors::CorvusError;
use crate::models::{Deployment, DeploymentStatus};
use crate::store::Store;

pub struct PipelineLogger {
    store: Store,
    deployment_id: String,
    slug: String,
    file: Option<std::fs::File>,
}

impl PipelineLogger {
    pub fn new(store: Store, deployment: &Deployment, file: Option<std::fs::File>) -> Self {
        Self {
            store,
            deployment_id: deployment.id.clone(),
            slug: deployment.slug.clone(),
            file,
        }
    }

    /// Record one pipeline step on both sinks.
    pub fn info(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(slug = %self.slug, "{message}");

        if let Some(file) = self.file.as_mut() {
            let line = format!(
                "[{}] {message}\n",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            );
            // Log write failures are non-fatal.
            let _ = file.write_all(line.as_bytes());
        }
    }

    /// Record an unrecoverable step failure and flip the deployment to
    /// `failed`. If the status write itself fails there is nothing left to
    /// do but record the secondary failure on the structured sink.
    pub async fn fail(&mut self, reason: &str, err: &CorvusError) {
        self.info(format!("FAILED: {reason}: {err}"));

        if let Err(db_err) = self
            .store
            .update_status(&self.deployment_id, DeploymentStatus::Failed)
            .await
        {
            error!(
                id = %self.deployment_id,
                error = %db_err,
                "failed to update status to failed"
            );
        }
    }

    /// Borrow the underlying log file, for handing to subprocesses that
    /// write their own output (git clone progress).
    pub fn file(&self) -> Option<&std::fs::File> {
        self.file.as_ref()
    }

    /// An owned writer over the file sink, or a discarding writer when no
    /// file is open. Used for build-container output.
    pub fn output_writer(&self) -> Box<dyn Write + Send> {
        match self.file.as_ref().and_then(|f| f.try_clone().ok()) {
            Some(file) => Box::new(file),
            None => Box::new(io::sink()),
        }
    }
}
