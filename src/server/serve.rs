//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::CorvusError;
use crate::server::handlers::{
    create_deployment_handler, create_zip_deployment_handler, delete_deployment_handler,
    get_deployment_handler, health_handler, list_deployments_handler, redeploy_handler,
};
use crate::server::state::ServerState;

/// Zip uploads carry whole prebuilt sites; the default axum body limit is
/// far too small for them.
const UPLOAD_BODY_LIMIT: usize = 512 * 1024 * 1024;

/// Start the HTTP server on its own task.
pub async fn serve(
    port: u16,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), CorvusError>>, CorvusError> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/deployments", get(list_deployments_handler))
        .route("/api/deployments", post(create_deployment_handler))
        .route(
            "/api/deployments/zip",
            post(create_zip_deployment_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/deployments/:id", get(get_deployment_handler))
        .route("/api/deployments/:id", delete(delete_deployment_handler))
        .route("/api/deployments/:id/redeploy", post(redeploy_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{port}");
    info!("starting HTTP server on {addr}");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CorvusError::Server(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| CorvusError::Server(e.to_string()))
    });

    Ok(handle)
}
