use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use logtally_engine::PassSettings;
use logtally_publish::{EventSink, JsonLinesEventSink, TracingMetricWriter};
use logtally_state::PointerStore;

mod config;
mod monitor;

use config::Config;
use monitor::Monitor;

/// Logtally - tails rotating log files and reports pattern occurrence metrics
#[derive(Parser, Debug)]
#[command(name = "logtally")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "logtally.toml")]
    config: PathBuf,

    /// Keep running, repeating a full pass every N seconds
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let config = Config::load(&args.config)?;
    let logs: Vec<_> = config.valid_logs().into_iter().map(Arc::new).collect();
    if logs.is_empty() {
        anyhow::bail!("no valid logs configured in {}", args.config.display());
    }

    let store = PointerStore::load(config.pointer_path(&args.config));

    let sink: Option<Arc<dyn EventSink>> = if config.events.enabled {
        let output = config
            .events
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("events.jsonl"));
        Some(Arc::new(JsonLinesEventSink::new(output)))
    } else {
        None
    };

    let monitor = Monitor {
        logs,
        store,
        settings: PassSettings {
            match_context_lines: config.match_context_lines,
            events_enabled: config.events.enabled,
        },
        metric_prefix: config.metric_prefix.clone(),
        writer: Arc::new(TracingMetricWriter),
        sink,
    };

    match args.interval {
        Some(seconds) => loop {
            monitor.run_once().await;
            tokio::time::sleep(Duration::from_secs(seconds)).await;
        },
        None => {
            monitor.run_once().await;
            Ok(())
        }
    }
}
