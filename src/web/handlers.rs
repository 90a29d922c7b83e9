//! HTTP handlers for the index page and the metrics endpoint.

use crate::metrics::exposition::{self, CONTENT_TYPE};
use crate::metrics::ReportSource;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Shared handler state: the report source, queried once per scrape.
pub struct AppState<S> {
    source: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

/// Serve the static landing page.
pub async fn default_index() -> Html<&'static str> {
    info!("Serving /");
    Html(DEFAULT_INDEX_HTML)
}

/// Collect a fresh report and render it as exposition text.
///
/// Collection or parse failures answer 500 and leave the server running.
pub async fn metrics<S>(State(state): State<AppState<S>>) -> Response
where
    S: ReportSource + Send + Sync + 'static,
{
    info!("Serving /metrics");
    let started = Instant::now();

    let report = match state.source.collect_report().await {
        Ok(report) => report,
        Err(e) => {
            if e.is_collection_failure() {
                error!("Failed to collect nvidia-smi report: {}", e);
            } else {
                error!("Failed to interpret nvidia-smi report: {}", e);
            }
            return failure(format!("failed to collect metrics: {}\n", e));
        }
    };

    match exposition::render(&report) {
        Ok(body) => {
            debug!(
                devices = report.gpus.len(),
                bytes = body.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Rendered metrics"
            );
            (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            error!("Failed to write metrics: {}", e);
            failure(format!("failed to write metrics: {}\n", e))
        }
    }
}

fn failure(body: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Landing page linking to the metrics endpoint.
pub const DEFAULT_INDEX_HTML: &str = r#"<!doctype html>
<html>
    <head>
        <meta charset="utf-8">
        <title>Nvidia SMI Exporter</title>
    </head>
    <body>
        <h1>Nvidia SMI Exporter</h1>
        <p><a href="/metrics">Metrics</a></p>
    </body>
</html>"#;
