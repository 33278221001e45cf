//! Corvus control plane - entry point.
//!
//! Startup order: config, logging, state store, docker ping, startup
//! reconciliation, reaper worker, HTTP server. Shutdown is signal-driven
//! with a bounded drain window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use corvus::config::AppConfig;
use corvus::dispatch::Dispatcher;
use corvus::docker::DockerClient;
use corvus::logs::init_logging;
use corvus::pipeline::{expiration, DeployerPipeline, PipelineConfig};
use corvus::server::serve::serve;
use corvus::server::state::ServerState;
use corvus::store::Store;

const MAX_SHUTDOWN_DELAY: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(config.log_format) {
        eprintln!("failed to initialize logging: {e}");
    }

    info!(
        port = config.port,
        db_path = %config.db_path.display(),
        asset_root = %config.asset_root.display(),
        "corvus control plane starting"
    );

    // Without a working store or a reachable docker daemon the platform
    // cannot function; fail fast instead of limping into requests.
    let store = match Store::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            error!("failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let docker = match DockerClient::connect().await {
        Ok(docker) => docker,
        Err(e) => {
            error!("failed to connect to docker daemon: {e}");
            std::process::exit(1);
        }
    };

    for dir in [&config.asset_root, &config.log_root] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!(path = %dir.display(), "failed to create data directory: {e}");
            std::process::exit(1);
        }
    }

    let pipeline = Arc::new(DeployerPipeline::new(
        store.clone(),
        docker.clone(),
        PipelineConfig {
            asset_root: config.asset_root.clone(),
            log_root: config.log_root.clone(),
            traefik_network: config.traefik_network.clone(),
            base_domain: config.base_domain.clone(),
        },
    ));

    // Rows may claim `live` for containers lost while the process was
    // down; fix them before accepting traffic.
    if let Err(e) = pipeline.reconcile_live_deployments().await {
        warn!("startup reconciliation failed: {e}");
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let reaper_options = expiration::Options {
        interval: config.reap_interval,
    };
    let reaper_pipeline = Arc::clone(&pipeline);
    let reaper_rx = shutdown_tx.subscribe();
    let reaper_handle = tokio::spawn(async move {
        expiration::run(&reaper_options, reaper_pipeline, reaper_rx).await;
    });

    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::clone(&pipeline),
        config.base_domain.clone(),
    );
    let state = Arc::new(ServerState::new(store, dispatcher));

    let mut server_rx = shutdown_tx.subscribe();
    let server_handle = match serve(config.port, state, async move {
        let _ = server_rx.recv().await;
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("failed to start HTTP server: {e}");
            std::process::exit(1);
        }
    };

    await_shutdown_signal().await;

    let _ = shutdown_tx.send(());

    let drain = async {
        if let Err(e) = reaper_handle.await {
            error!("reaper task join failed: {e}");
        }
        match server_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("HTTP server exited with error: {e}"),
            Err(e) => error!("server task join failed: {e}"),
        }
    };

    if tokio::time::timeout(MAX_SHUTDOWN_DELAY, drain).await.is_err() {
        error!("shutdown timed out after {MAX_SHUTDOWN_DELAY:?}, forcing exit");
        std::process::exit(1);
    }

    info!("shutdown complete");
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
