use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use dsc_collector::{exporter, CollectorConfig, StatsCollector};
use dsc_config::ConfigManager;
use dsc_types::DnsMessage;

/// DNS statistics collector
#[derive(Parser, Debug)]
#[command(name = "dsc-collector", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decoded messages as JSON lines; stdin when omitted or `-`
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        print!("{}", toml::to_string_pretty(&CollectorConfig::default())?);
        return Ok(());
    }

    let manager = match &args.config {
        Some(path) => ConfigManager::<CollectorConfig>::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigManager::new(CollectorConfig::default()),
    };
    let config = manager.get();

    let _log_guard = dsc_logging::init_logging(&config.log).context("initializing logging")?;
    tracing::info!(
        config = ?manager.path(),
        interval = config.statistics_interval,
        "Starting dsc collector"
    );

    let collector = Arc::new(StatsCollector::from_config(&config)?);
    let exporter = exporter::from_config(&config.exporter);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let intervals = {
        let collector = collector.clone();
        tokio::spawn(async move {
            collector
                .run_intervals(&*exporter, async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await;
        })
    };

    let input = open_input(args.input.as_ref()).await?;
    tokio::select! {
        result = ingest(&collector, input) => {
            let lines = result?;
            tracing::info!(lines, "Input exhausted");
        }
        result = wait_for_shutdown_signal() => result?,
    }

    let _ = shutdown_tx.send(true);
    intervals.await.context("interval task")?;

    let stats = collector.stats();
    tracing::info!(
        messages = stats.messages_seen,
        capacity_errors = stats.capacity_errors,
        intervals = stats.intervals_exported,
        "dsc collector stopped"
    );
    Ok(())
}

async fn open_input(
    path: Option<&PathBuf>,
) -> anyhow::Result<Box<dyn AsyncRead + Unpin + Send>> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            let file = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("opening {}", p.display()))?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(tokio::io::stdin())),
    }
}

/// Feed every decoded message to the collector. Returns the number of lines
/// read; undecodable lines are logged and skipped.
async fn ingest(
    collector: &StatsCollector,
    input: Box<dyn AsyncRead + Unpin + Send>,
) -> anyhow::Result<u64> {
    let mut lines = BufReader::new(input).lines();
    let mut n = 0u64;
    while let Some(line) = lines.next_line().await? {
        n += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DnsMessage>(&line) {
            Ok(msg) => {
                collector.classify(&msg);
            }
            Err(e) => tracing::warn!(line = n, error = %e, "Skipping undecodable message"),
        }
    }
    Ok(n)
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Received CTRL+C");
        }
        _ = sigterm.recv() => { tracing::info!("Received SIGTERM"); }
    }
    Ok(())
}
