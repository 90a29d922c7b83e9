//! GPU metrics acquisition and rendering.
//!
//! The pipeline runs once per scrape: the [`collector`] obtains raw XML, the
//! [`parser`] turns it into a [`data::DiagnosticReport`], and [`exposition`]
//! writes it out as text, applying the [`normalize`] conversions per field.

pub mod collector;
pub mod data;
pub mod exposition;
pub mod normalize;
pub mod parser;
pub mod traits;

// Re-export commonly used items
pub use collector::{Collector, CollectorConfig, CollectorSource};
pub use data::DiagnosticReport;
pub use exposition::{render, LabelSet, MetricWriter};
pub use parser::parse_report;
pub use traits::ReportSource;
