//! Server startup and graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use archiva_core::Config;
use axum::Router;

use crate::state::AppState;

/// How long in-flight enrichment jobs get to record their outcome on exit.
const ENRICHMENT_GRACE: Duration = Duration::from_secs(10);

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router, state: Arc<AppState>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        catalog_prefix = %config.catalog_prefix(),
        bucket_prefix = %config.bucket_prefix(),
        fetch_max_bytes = config.fetch_max_bytes(),
        fetch_timeout_seconds = config.fetch_timeout_seconds(),
        transcode_concurrency = config.transcode_concurrency(),
        translation_enabled = state.enrichment.is_configured(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.enrichment.shutdown(ENRICHMENT_GRACE).await;
    archiva_infra::shutdown_telemetry().await;

    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
///
/// If a handler cannot be installed the error is logged and that signal is
/// ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
