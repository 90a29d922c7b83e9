//! Acquisition of raw reports from `nvidia-smi` or a fixture file.

use crate::error::{ExporterError, Result};
use crate::metrics::traits::ReportSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default location of the diagnostic tool.
pub const DEFAULT_NVIDIA_SMI_PATH: &str = "/usr/bin/nvidia-smi";

/// Arguments requesting the full query as XML.
pub const NVIDIA_SMI_ARGS: [&str; 2] = ["-q", "-x"];

/// Fixture read instead of invoking the tool, relative to the working directory.
pub const DEFAULT_SAMPLE_FILE: &str = "nvidia-smi.sample.xml";

/// Default bound on a single tool invocation, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const STDERR_EXCERPT_LEN: usize = 256;

/// Where the collector takes its snapshots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorSource {
    /// Run `nvidia-smi -q -x`
    Command,
    /// Read the sample file
    Fixture,
}

/// Configuration for the [`Collector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub source: CollectorSource,
    /// Path to the `nvidia-smi` executable
    pub nvidia_smi_path: PathBuf,
    /// Path to the fixture used in test mode
    pub sample_path: PathBuf,
    /// Upper bound on one invocation, in seconds
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source: CollectorSource::Command,
            nvidia_smi_path: PathBuf::from(DEFAULT_NVIDIA_SMI_PATH),
            sample_path: PathBuf::from(DEFAULT_SAMPLE_FILE),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CollectorConfig {
    /// Configuration reading snapshots from `path` instead of the tool.
    pub fn fixture(path: impl Into<PathBuf>) -> Self {
        Self {
            source: CollectorSource::Fixture,
            sample_path: path.into(),
            ..Default::default()
        }
    }

    /// Select fixture mode when `test_mode` is set, command mode otherwise.
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.source = if test_mode {
            CollectorSource::Fixture
        } else {
            CollectorSource::Command
        };
        self
    }

    pub fn with_nvidia_smi_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.nvidia_smi_path = path.into();
        self
    }

    pub fn with_sample_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sample_path = path.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_test_mode(&self) -> bool {
        self.source == CollectorSource::Fixture
    }

    /// Reject settings that can never produce a snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ExporterError::config_error("timeout must be at least one second"));
        }
        let path = match self.source {
            CollectorSource::Command => &self.nvidia_smi_path,
            CollectorSource::Fixture => &self.sample_path,
        };
        if path.as_os_str().is_empty() {
            return Err(ExporterError::config_error(format!(
                "empty path for {:?} source",
                self.source
            )));
        }
        Ok(())
    }
}

/// Produces one raw snapshot per call. Holds no state besides its configuration.
#[derive(Debug, Clone)]
pub struct Collector {
    config: CollectorConfig,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Human-readable description of the source, for logs.
    pub fn describe(&self) -> String {
        match self.config.source {
            CollectorSource::Command => format!(
                "{} {}",
                self.config.nvidia_smi_path.display(),
                NVIDIA_SMI_ARGS.join(" ")
            ),
            CollectorSource::Fixture => format!("fixture {}", self.config.sample_path.display()),
        }
    }

    async fn read_fixture(&self, path: &Path) -> Result<Vec<u8>> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            warn!(path = %path.display(), "Failed to read sample file: {}", e);
            ExporterError::Io(e)
        })?;
        ensure_not_blank(&raw, || path.display().to_string())?;
        Ok(raw)
    }

    async fn run_command(&self) -> Result<Vec<u8>> {
        let command = self.config.nvidia_smi_path.display().to_string();
        let timeout = self.config.timeout();
        let started = Instant::now();

        let mut cmd = Command::new(&self.config.nvidia_smi_path);
        cmd.args(NVIDIA_SMI_ARGS).kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| ExporterError::Launch {
                command: command.clone(),
                source,
            })?,
            Err(_) => return Err(ExporterError::Timeout { command, timeout }),
        };

        debug!(
            command = %command,
            status = %output.status,
            bytes = output.stdout.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "nvidia-smi finished"
        );

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(STDERR_EXCERPT_LEN)
                .collect();
            return Err(ExporterError::CommandFailed {
                command,
                status: output.status,
                stderr,
            });
        }

        ensure_not_blank(&output.stdout, || command.clone())?;
        Ok(output.stdout)
    }
}

impl ReportSource for Collector {
    async fn fetch(&self) -> Result<Vec<u8>> {
        match self.config.source {
            CollectorSource::Command => self.run_command().await,
            CollectorSource::Fixture => self.read_fixture(&self.config.sample_path).await,
        }
    }
}

fn ensure_not_blank(raw: &[u8], origin: impl FnOnce() -> String) -> Result<()> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ExporterError::EmptyOutput(origin()));
    }
    Ok(())
}
