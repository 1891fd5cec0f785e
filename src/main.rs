//! `outbound-metrics`: issue instrumented requests and print the resulting metrics.

use std::path::PathBuf;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use http_body_util::Empty;

use outbound_metrics::config::{self, AppConfig};
use outbound_metrics::observability;
use outbound_metrics::probe::{self, ProbeTransport};
use outbound_metrics::{transport, Instrumentor};

#[derive(Parser)]
#[command(name = "outbound-metrics")]
#[command(about = "Prometheus metrics for outbound HTTP requests", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request each target, print one JSON report per request, then the exposition
    Probe {
        /// Target URL; repeatable, replaces configured targets
        #[arg(short, long)]
        url: Vec<String>,
        #[arg(short, long)]
        method: Option<String>,
        #[arg(short, long)]
        repeat: Option<u32>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    if let Err(e) = observability::init_logging(&config.observability) {
        eprintln!("logging already initialized: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "outbound-metrics starting");

    let instrumentor = Instrumentor::from_config(None, &config.metrics)?;
    let base = transport::boxed(transport::default_transport::<Empty<Bytes>>(&config.transport)?);
    let instrumented: ProbeTransport = instrumentor.instrument(base);

    match cli.command {
        Commands::Probe { url, method, repeat, concurrency } => {
            if !url.is_empty() {
                config.probe.targets = url;
            }
            if let Some(method) = method {
                config.probe.method = method;
            }
            if let Some(repeat) = repeat {
                config.probe.repeat = repeat;
            }
            if let Some(concurrency) = concurrency {
                config.probe.concurrency = concurrency;
            }
            if config.probe.targets.is_empty() {
                return Err("no probe targets configured; pass --url or set probe.targets".into());
            }

            let reports = probe::run_probes(instrumented, &config.probe).await?;
            for report in &reports {
                println!("{}", serde_json::to_string(report)?);
            }
            let failed = reports.iter().filter(|r| !r.is_success()).count();
            tracing::info!(total = reports.len(), failed, "Probes finished");

            print!("{}", instrumentor.encode()?);
        }
    }

    Ok(())
}
