//! Error handling for the nvidia-smi exporter.

use std::time::Duration;

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The main error type for exporter operations.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The diagnostic tool could not be started
    #[error("Failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The diagnostic tool exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The diagnostic tool produced nothing to parse
    #[error("{0} produced no output")]
    EmptyOutput(String),

    /// The diagnostic tool did not finish in time
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The XML report could not be parsed
    #[error("Failed to parse diagnostic report: {0}")]
    ParseError(String),

    /// Writing a metric line failed
    #[error("Failed to write metric {metric}: {source}")]
    Write {
        metric: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExporterError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure came from obtaining the raw report, as opposed to
    /// interpreting or writing it.
    pub fn is_collection_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Launch { .. }
                | Self::CommandFailed { .. }
                | Self::EmptyOutput(_)
                | Self::Timeout { .. }
        )
    }
}

impl From<quick_xml::DeError> for ExporterError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_format_message() {
        let err = ExporterError::parse_error("unexpected end of document");
        assert!(err.to_string().contains("unexpected end of document"));

        let err = ExporterError::config_error("bad port");
        assert_eq!(err.to_string(), "Configuration error: bad port");

        let err = ExporterError::web_server_error("bind failed");
        assert!(err.to_string().contains("bind failed"));
    }

    #[test]
    fn test_collection_failure_classification() {
        let timeout = ExporterError::Timeout {
            command: "nvidia-smi".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(timeout.is_collection_failure());
        assert!(ExporterError::EmptyOutput("nvidia-smi".into()).is_collection_failure());
        assert!(!ExporterError::parse_error("x").is_collection_failure());
    }
}
