//! # Pair Monitor Service
//!
//! Enumerates every pair of the configured factory, then logs liquidity changes on all
//! of them until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! BLOCKCHAIN_URL=wss://mainnet.example.org cargo run --bin pair_monitor
//! cargo run --bin pair_monitor -- --config Config.toml --max-concurrency 100
//! ```
//!
//! Press Ctrl+C to stop gracefully.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use pair_monitor::{
    adapters::WsChainClient,
    monitor::{LoggingHandler, MonitorExit},
    orchestrator::Orchestrator,
    settings::Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "pair_monitor", about = "Enumerate factory pairs and watch them for liquidity changes")]
struct Args {
    /// Configuration file (defaults to ./Config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node endpoint; overrides rpc.url and BLOCKCHAIN_URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Factory contract address
    #[arg(long)]
    factory: Option<String>,

    /// Maximum concurrent pair lookups
    #[arg(long)]
    max_concurrency: Option<usize>,
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;

    if let Some(endpoint) = &args.endpoint {
        settings.rpc.url = endpoint.clone();
    }
    if let Some(factory) = &args.factory {
        settings.factory.address = factory.clone();
    }
    if let Some(max_concurrency) = args.max_concurrency {
        settings.enumeration.max_concurrency = max_concurrency;
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

async fn run(settings: Settings, cancel: CancellationToken) -> Result<()> {
    let factory = settings.factory_address()?;

    let client = WsChainClient::dial(&settings.rpc.url)
        .await
        .context("failed to connect to blockchain node")?
        .with_channel_capacity(settings.monitor.channel_capacity)
        .with_health_check_interval(settings.monitor.health_check_interval());
    let client = Arc::new(client);
    let registry = Arc::new(client.factory_registry(factory));

    let orchestrator = Orchestrator::new(registry, Arc::clone(&client), &settings);
    let summary = orchestrator.run(&LoggingHandler, &cancel).await?;

    let failed = summary.enumeration.pairs.failed_ids();
    if !failed.is_empty() {
        warn!(
            "⚠️ {} pairs could not be resolved and were not monitored",
            failed.len()
        );
    }

    match summary.monitor.map(|report| report.exit) {
        Some(MonitorExit::Exhausted) => {
            anyhow::bail!("log subscription closed by the node and restarts are disabled")
        }
        Some(exit) => info!("Monitor exited: {:?}", exit),
        None => info!("Stopped before monitoring started"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log.level))
        .init();

    info!("🚀 Starting pair monitor for factory {}", settings.factory.address);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Shutdown signal received, stopping...");
                shutdown.cancel();
            }
            Err(e) => error!("❌ Failed to listen for Ctrl+C: {}", e),
        }
    });

    if let Err(e) = run(settings, cancel).await {
        error!("❌ {:#}", e);
        return Err(e);
    }
    Ok(())
}
