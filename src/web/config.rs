//! Web server configuration.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration for the web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_WEB_HOST.to_string(),
            port: crate::DEFAULT_WEB_PORT,
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Set the host for the web server.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port for the web server.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the bind address into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address()
            .parse()
            .map_err(|e| ExporterError::config_error(format!("Invalid bind address: {}", e)))
    }
}
