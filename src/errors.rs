//! Error types for the corvus control plane

use thiserror::Error;

/// Main error type for the control plane.
///
/// Variants fall into three groups: caller mistakes surfaced to the API
/// (`NotFound`, `Conflict`, `InvalidRequest`), deployment-content defects
/// recorded in the per-deployment log (`ArchiveEscape` through
/// `AssetsMissing`), and infrastructure faults (the runtime and store
/// variants).
#[derive(Error, Debug)]
pub enum CorvusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("zip entry escapes extraction directory: {0}")]
    ArchiveEscape(String),

    #[error("unsupported entry type: {0}")]
    UnsupportedEntryType(String),

    #[error("output directory {0:?} not found in source content")]
    OutputMissing(String),

    #[error("git clone failed: {0}")]
    CloneFailed(String),

    #[error("build command exited with code {code}")]
    BuildFailed { code: i64 },

    #[error("docker daemon unreachable: {0}")]
    RuntimeUnreachable(String),

    #[error("image pull failed: {0}")]
    ImagePull(String),

    #[error("container create failed: {0}")]
    ContainerCreate(String),

    #[error("container start failed: {0}")]
    ContainerStart(String),

    #[error("docker error: {0}")]
    Runtime(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("deployment assets missing on disk: {0}")]
    AssetsMissing(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),
}
