//! kwarden agent entry point.
//!
//! Initialises tracing, loads configuration from `KWARDEN_AGENT_*`
//! environment variables and serves the agent HTTP API until Ctrl-C or
//! SIGTERM.

mod config;
mod error;
mod executor;
mod kube;
mod render;
mod routes;
mod runner;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ENV_PREFIX};
use crate::runner::TokioCommandRunner;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: Config = envy::prefixed(ENV_PREFIX).from_env().context(
        "failed to load config from KWARDEN_AGENT_* env vars \
         (KWARDEN_AGENT_TEMPLATES_DIR and KWARDEN_AGENT_APPLIED_DIR are required)",
    )?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        templates_dir = %config.templates_dir.display(),
        applied_dir = %config.applied_dir.display(),
        kubectl = %config.kubectl,
        command_timeout_secs = config.command_timeout_secs,
        "configuration loaded",
    );

    tokio::fs::create_dir_all(&config.applied_dir)
        .await
        .with_context(|| format!("failed to create {}", config.applied_dir.display()))?;
    if !config.templates_dir.is_dir() {
        tracing::warn!(
            templates_dir = %config.templates_dir.display(),
            "templates directory does not exist; deploys will fail until it does",
        );
    }

    let runner = Arc::new(TokioCommandRunner::new(config.command_timeout()));
    let state = Arc::new(AppState::new(&config, runner));
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "kwarden agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("kwarden agent shut down");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("received shutdown signal");
}
