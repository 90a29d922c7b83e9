//! XML deserialization of the diagnostic report.

use crate::error::{ExporterError, Result};
use crate::metrics::data::DiagnosticReport;
use tracing::debug;

/// Parse the raw output of `nvidia-smi -q -x`.
///
/// Unknown elements are skipped and absent ones come back as empty strings.
/// Only input that is not well-formed XML is rejected.
pub fn parse_report(raw: &[u8]) -> Result<DiagnosticReport> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ExporterError::parse_error(format!("report is not valid UTF-8: {}", e)))?;

    let report: DiagnosticReport = quick_xml::de::from_str(text)?;
    debug!(
        devices = report.gpus.len(),
        driver = %report.driver_version,
        "Parsed diagnostic report"
    );

    Ok(report)
}
