//! HTTP request handlers.
//!
//! Thin plumbing over the dispatch surface and the store: decode, validate,
//! dispatch, map error kinds to status codes. No handler touches Docker or
//! the filesystem beyond spooling an upload.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use crate::dispatch::NewDeployment;
use crate::errors::CorvusError;
use crate::models::SourceSpec;
use crate::server::state::ServerState;
use crate::util::version_info;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub git_hash: String,
}

pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "corvus-control-plane".to_string(),
        version: version.version,
        git_hash: version.git_hash,
    })
}

/// GET /api/deployments: all deployments, newest first. Always a JSON
/// array, never null.
pub async fn list_deployments_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.store.list().await {
        Ok(deployments) => (StatusCode::OK, Json(deployments)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/deployments/:id
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get(&id).await {
        Ok(deployment) => (StatusCode::OK, Json(deployment)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// JSON body for POST /api/deployments (github sources; zip deployments
/// arrive as multipart uploads on their own route).
#[derive(Debug, Deserialize)]
pub struct CreateDeploymentRequest {
    pub name: String,

    #[serde(flatten)]
    pub source: SourceSpec,

    #[serde(default)]
    pub build_command: String,

    #[serde(default)]
    pub output_directory: String,

    #[serde(default)]
    pub environment_variables: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub auto_deploy: bool,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateDeploymentRequest {
    fn into_new_deployment(self) -> NewDeployment {
        NewDeployment {
            name: self.name,
            source: self.source,
            build_command: self.build_command,
            output_directory: if self.output_directory.is_empty() {
                ".".to_string()
            } else {
                self.output_directory
            },
            env_vars: self.environment_variables,
            auto_deploy: self.auto_deploy,
            expires_at: self.expires_at,
        }
    }
}

/// POST /api/deployments
pub async fn create_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CreateDeploymentRequest>,
) -> Response {
    if matches!(request.source, SourceSpec::Zip) {
        return error_response(&CorvusError::InvalidRequest(
            "zip deployments must be uploaded via /api/deployments/zip".to_string(),
        ));
    }

    match state
        .dispatcher
        .create_from_git(request.into_new_deployment())
        .await
    {
        Ok(deployment) => (StatusCode::CREATED, Json(deployment)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/deployments/zip, a multipart form with the metadata fields and
/// the archive under `file`. The archive is spooled to
/// `<tempRoot>/corvus-upload-<uuid>.zip`; ownership of that file passes to
/// the pipeline, which removes it after extraction.
pub async fn create_zip_deployment_handler(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> Response {
    let parsed = match parse_zip_upload(multipart).await {
        Ok(parsed) => parsed,
        Err(e) => return error_response(&e),
    };

    let Some(archive_path) = parsed.archive_path else {
        return error_response(&CorvusError::InvalidRequest(
            "zip file is required".to_string(),
        ));
    };

    let result = state
        .dispatcher
        .create_from_zip(parsed.request, archive_path.clone())
        .await;

    match result {
        Ok(deployment) => (StatusCode::CREATED, Json(deployment)).into_response(),
        Err(e) => {
            // The pipeline never launched, so the spooled upload is still
            // this handler's to clean up.
            let _ = tokio::fs::remove_file(&archive_path).await;
            error_response(&e)
        }
    }
}

struct ParsedZipUpload {
    request: NewDeployment,
    archive_path: Option<PathBuf>,
}

async fn parse_zip_upload(mut multipart: Multipart) -> Result<ParsedZipUpload, CorvusError> {
    let mut name = String::new();
    let mut build_command = String::new();
    let mut output_directory = ".".to_string();
    let mut env_vars: Option<BTreeMap<String, String>> = None;
    let mut auto_deploy = false;
    let mut expires_at: Option<DateTime<Utc>> = None;
    let mut archive_path: Option<PathBuf> = None;

    let read_err =
        |e: axum::extract::multipart::MultipartError| CorvusError::InvalidRequest(e.to_string());

    while let Some(mut field) = multipart.next_field().await.map_err(read_err)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = field.text().await.map_err(read_err)?,
            "build_command" => build_command = field.text().await.map_err(read_err)?,
            "output_directory" => {
                let text = field.text().await.map_err(read_err)?;
                if !text.is_empty() {
                    output_directory = text;
                }
            }
            "environment_variables" => {
                let text = field.text().await.map_err(read_err)?;
                if !text.is_empty() {
                    env_vars = Some(serde_json::from_str(&text).map_err(|e| {
                        CorvusError::InvalidRequest(format!("invalid environment_variables: {e}"))
                    })?);
                }
            }
            "auto_deploy" => {
                let text = field.text().await.map_err(read_err)?;
                auto_deploy = text == "true" || text == "1";
            }
            "expires_at" => {
                let text = field.text().await.map_err(read_err)?;
                if !text.is_empty() {
                    let parsed = DateTime::parse_from_rfc3339(&text).map_err(|e| {
                        CorvusError::InvalidRequest(format!("invalid expires_at: {e}"))
                    })?;
                    expires_at = Some(parsed.with_timezone(&Utc));
                }
            }
            "file" => {
                let path =
                    std::env::temp_dir().join(format!("corvus-upload-{}.zip", Uuid::new_v4()));
                let mut out = tokio::fs::File::create(&path).await?;
                // Stream the upload to disk instead of buffering the whole
                // archive in memory.
                loop {
                    match field.chunk().await.map_err(read_err) {
                        Ok(Some(chunk)) => out.write_all(&chunk).await?,
                        Ok(None) => break,
                        Err(e) => {
                            drop(out);
                            let _ = tokio::fs::remove_file(&path).await;
                            return Err(e);
                        }
                    }
                }
                out.flush().await?;
                archive_path = Some(path);
            }
            _ => {}
        }
    }

    Ok(ParsedZipUpload {
        request: NewDeployment {
            name,
            source: SourceSpec::Zip,
            build_command,
            output_directory,
            env_vars,
            auto_deploy,
            expires_at,
        },
        archive_path,
    })
}

/// POST /api/deployments/:id/redeploy
pub async fn redeploy_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.redeploy(&id).await {
        Ok(deployment) => (StatusCode::OK, Json(deployment)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/deployments/:id
pub async fn delete_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: &CorvusError) -> Response {
    let (status, message) = match err {
        CorvusError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CorvusError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CorvusError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            error!(error = %err, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };

    (status, Json(ErrorBody { error: message })).into_response()
}
