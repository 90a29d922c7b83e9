//! HTTP server exposing the exporter's index page and `/metrics` endpoint.
//!
//! Every scrape of `/metrics` runs a fresh collection; nothing is cached
//! between requests.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{ExporterError, Result};
use crate::metrics::Collector;
use std::sync::Arc;
use tracing::info;

/// Start the web server with the provided configuration and collector.
///
/// Returns once a shutdown signal is received. Failing to bind is the only
/// startup error.
pub async fn start_web_server(config: WebConfig, collector: Collector) -> Result<()> {
    let addr = config.socket_addr()?;
    let source = collector.describe();
    let app = create_app(Arc::new(collector));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Nvidia SMI exporter listening on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);
    info!("Reading reports from {}", source);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
