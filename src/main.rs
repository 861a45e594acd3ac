//! Pod Recycler - crash-loop remediation service
//!
//! This service keeps workloads moving by:
//! - Watching every pod in the cluster through a self-healing watch loop
//! - Force deleting pods stuck in `CrashLoopBackOff` so their owners
//!   recreate them immediately
//! - Providing health and readiness endpoints for cluster deployment

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, response::Json, routing::get, Router};
use clap::Parser;
use pod_recycler::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use pod_recycler::{KubeClusterClient, RecyclerConfig, WatchSupervisor};
use serde_json::{json, Value};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pod-recycler")]
#[command(about = "Force deletes pods stuck in CrashLoopBackOff so their owners replace them")]
#[command(version)]
struct Args {
    /// Path to a kubeconfig file; ambient cluster identity is used when omitted
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pod_recycler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting pod recycler v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config();
    config.validate().context("Invalid recycler configuration")?;

    // No usable identity is a fatal startup condition
    let cluster = match args.kubeconfig.as_deref() {
        Some(path) => KubeClusterClient::from_kubeconfig(path)
            .await
            .with_context(|| {
                format!("Failed to create Kubernetes client from {}", path.display())
            })?,
        None => KubeClusterClient::connect()
            .await
            .context("Failed to create Kubernetes client from ambient configuration")?,
    };
    info!("Connected to Kubernetes cluster");

    // Start the watch loop in the background
    let supervisor = WatchSupervisor::new(Arc::new(cluster), config.watch.reconnect_delay());
    let supervisor_handle = tokio::spawn(async move { supervisor.run().await });

    // Build the HTTP router for liveness and readiness probes
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(10),
                )),
        );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("Probe server listening on {}", config.server.bind_address);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor_handle.abort();
    info!("Pod recycler stopped");

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "pod-recycler",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check() -> Json<Value> {
    Json(json!({
        "status": "ready",
        "service": "pod-recycler",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn load_config() -> RecyclerConfig {
    let override_path = std::env::var(CONFIG_PATH_ENV).ok();
    let config_path = override_path
        .as_deref()
        .filter(|path| Path::new(path).exists())
        .unwrap_or(DEFAULT_CONFIG_PATH);

    match RecyclerConfig::from_mounted_file(config_path) {
        Ok(cfg) => {
            info!("Loaded recycler configuration from {}", config_path);
            cfg
        }
        Err(err) => {
            warn!(
                "Failed to load configuration from {}: {}. Using defaults.",
                config_path, err
            );
            RecyclerConfig::default()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
