//! Traits for obtaining diagnostic reports.

use crate::error::Result;
use crate::metrics::data::DiagnosticReport;
use crate::metrics::parser::parse_report;
use std::future::Future;

/// A source of raw `nvidia-smi -q -x` output.
///
/// Every call produces a fresh snapshot; implementations keep no state
/// between calls.
pub trait ReportSource {
    /// Fetch the raw XML bytes of one snapshot.
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Fetch and parse one snapshot.
    fn collect_report(&self) -> impl Future<Output = Result<DiagnosticReport>> + Send
    where
        Self: Sync,
    {
        async move {
            let raw = self.fetch().await?;
            parse_report(&raw)
        }
    }
}
