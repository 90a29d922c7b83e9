//! Web application router and middleware setup.

use crate::metrics::ReportSource;
use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the axum application serving `/` and `/metrics` from `source`.
pub fn create_app<S>(source: Arc<S>) -> Router
where
    S: ReportSource + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(handlers::default_index))
        .route("/metrics", get(handlers::metrics::<S>))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(AppState::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExporterError, Result};
    use crate::metrics::exposition::CONTENT_TYPE;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Serves a canned document, or fails like a missing binary.
    struct StaticSource(Option<&'static str>);

    impl ReportSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<u8>> {
            match self.0 {
                Some(xml) => Ok(xml.as_bytes().to_vec()),
                None => Err(ExporterError::Launch {
                    command: "/usr/bin/nvidia-smi".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                }),
            }
        }
    }

    const ONE_DEVICE: &str = r#"<nvidia_smi_log>
        <driver_version>450.80.02</driver_version>
        <attached_gpus>1</attached_gpus>
        <gpu id="0">
            <product_name>Tesla T4</product_name>
            <uuid>GPU-abc</uuid>
            <fan_speed>N/A</fan_speed>
        </gpu>
    </nvidia_smi_log>"#;

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = create_app(Arc::new(StaticSource(None)));
        let (status, body) = get_path(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<a href=\"/metrics\">Metrics</a>"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = create_app(Arc::new(StaticSource(Some(ONE_DEVICE))));
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], CONTENT_TYPE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(
            "nvidiasmi_driver_version{id=\"0\",uuid=\"GPU-abc\",name=\"Tesla T4\"} 450.80\n"
        ));
        assert!(body.contains("nvidiasmi_fan_speed_percent{id=\"0\",uuid=\"GPU-abc\",name=\"Tesla T4\"} 0\n"));
    }

    #[tokio::test]
    async fn test_collector_failure_keeps_serving() {
        let app = create_app(Arc::new(StaticSource(None)));

        let (status, body) = get_path(app.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("failed to collect metrics"));

        let (status, _) = get_path(app, "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_report_is_server_error() {
        let app = create_app(Arc::new(StaticSource(Some("<nvidia_smi_log><gpu>"))));
        let (status, _) = get_path(app, "/metrics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_app(Arc::new(StaticSource(None)));
        let (status, _) = get_path(app, "/api/snapshot").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
