//! # Nvidia SMI Exporter
//!
//! A Prometheus exporter that republishes `nvidia-smi` diagnostics as flat,
//! unit-consistent metrics over HTTP.
//!
//! ## Features
//!
//! - **Per-scrape collection**: every `GET /metrics` runs `nvidia-smi -q -x` afresh
//! - **Normalized values**: watts, bytes, hertz, percent and bytes/second, with `N/A` as zero
//! - **Device and process labels**: `id`, `uuid`, `name`, plus `process_pid` and `process_type`
//! - **Fixture mode**: serve a sample report instead of invoking the tool
//! - **Library + Binary**: Use as a crate or standalone application
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nvidia_smi_exporter::{start_web_server, Collector, CollectorConfig, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = Collector::new(CollectorConfig::default())?;
//!
//!     // Serve on 0.0.0.0:9202
//!     start_web_server(WebConfig::default(), collector).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod web;

// Re-export public API
pub use error::{ExporterError, Result};
pub use metrics::{
    collector::{Collector, CollectorConfig, CollectorSource},
    data::{DiagnosticReport, Device, Process},
    exposition::{render, LabelSet, MetricWriter},
    parser::parse_report,
    traits::ReportSource,
};

pub use web::{create_app, start_web_server, WebConfig};

/// The default web server host
pub const DEFAULT_WEB_HOST: &str = "0.0.0.0";

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 9202;
