//! Nvidia SMI Exporter binary
//!
//! Serves `nvidia-smi` diagnostics as Prometheus metrics on port 9202.

use clap::{builder::FalseyValueParser, Args, Parser, Subcommand};
use nvidia_smi_exporter::{
    metrics::collector::{DEFAULT_NVIDIA_SMI_PATH, DEFAULT_SAMPLE_FILE, DEFAULT_TIMEOUT_SECS},
    render, start_web_server, Collector, CollectorConfig, ReportSource, WebConfig,
    DEFAULT_WEB_HOST, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "nvidia_smi_exporter")]
#[command(about = "Prometheus exporter for nvidia-smi diagnostics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Runs `nvidia-smi -q -x` on every scrape and serves the result in the Prometheus text format")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = DEFAULT_WEB_HOST)]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Path to the nvidia-smi executable
    #[arg(long, default_value = DEFAULT_NVIDIA_SMI_PATH)]
    nvidia_smi_path: PathBuf,

    /// Sample report served in test mode
    #[arg(long, default_value = DEFAULT_SAMPLE_FILE)]
    sample_file: PathBuf,

    /// Seconds to wait for nvidia-smi before failing the scrape
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Read the sample report instead of running nvidia-smi
    #[arg(long, env = "TEST_MODE", value_parser = FalseyValueParser::new())]
    test_mode: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve,

    /// Collect a single report, print it and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: prometheus or json
    #[arg(short, long, default_value = "prometheus")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let collector = Collector::new(collector_config(&cli))?;
    if collector.config().is_test_mode() {
        info!("Test mode is enabled");
    }

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(&collector, args).await?,
        Some(Commands::Serve) | None => serve_command(&cli, collector).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn collector_config(cli: &Cli) -> CollectorConfig {
    CollectorConfig::default()
        .with_test_mode(cli.test_mode)
        .with_nvidia_smi_path(&cli.nvidia_smi_path)
        .with_sample_path(&cli.sample_file)
        .with_timeout_secs(cli.timeout_secs)
}

async fn serve_command(cli: &Cli, collector: Collector) -> anyhow::Result<()> {
    let web_config = WebConfig::new(&cli.host, cli.port);

    info!("Starting Nvidia SMI exporter...");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - Source: {}", collector.describe());
    info!("  - Timeout: {}s", collector.config().timeout_secs);

    start_web_server(web_config, collector).await?;

    Ok(())
}

async fn snapshot_command(collector: &Collector, args: &SnapshotArgs) -> anyhow::Result<()> {
    let report = collector.collect_report().await?;

    match args.format.as_str() {
        "prometheus" => print!("{}", render(&report)?),
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        other => anyhow::bail!("Unsupported format: {}. Use 'prometheus' or 'json'", other),
    }

    Ok(())
}
