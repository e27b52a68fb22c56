mod config;
mod monitor;

use anyhow::{Context, Result};
use clap::Parser;
use config::NodeConfig;
use hedge_api::AppState;
use hedge_gateway::{LedgerGateway, SystemClock};
use hedge_oracles::{CachedFeed, MarketDataProvider, ReflectorFeed, StaticFeed};
use hedge_storage::Ledger;
use monitor::MonitorService;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON node configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, default_value = "./data")]
    data_dir: String,
    /// Overrides `listen_addr` from the config file
    #[arg(short, long)]
    listen: Option<SocketAddr>,
    /// Serve simulated rates even if an oracle URL is configured
    #[arg(long)]
    static_feed: bool,
}

fn offline_feed() -> StaticFeed {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    StaticFeed::simulated(
        &[
            ("MXN", Decimal::new(1745, 2)),
            ("COP", Decimal::new(3950, 0)),
            ("BRL", Decimal::new(495, 2)),
            ("ARS", Decimal::new(820, 0)),
            ("CLP", Decimal::new(890, 0)),
            ("PEN", Decimal::new(375, 2)),
        ],
        now,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut node_config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    if let Some(listen) = args.listen {
        node_config.listen_addr = listen;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(node_config.level()?)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let contracts = node_config.contracts();
    info!("Starting Hedge node on {}", node_config.network);
    info!("Hedge contract {} via {}", contracts.hedge, contracts.rpc_url);

    let ledger = Arc::new(Ledger::open(&args.data_dir).context("Failed to open ledger")?);
    info!("Ledger loaded from {} ({} users)", args.data_dir, ledger.users()?.len());

    let supported = node_config.supported_currencies();
    let refresh = Duration::from_secs(node_config.refresh_interval_secs);
    let market: Arc<dyn MarketDataProvider> = match (&node_config.oracle_url, args.static_feed) {
        (Some(url), false) => {
            info!("Using price oracle at {}", url);
            let live = Arc::new(ReflectorFeed::new(url, supported.clone()));
            Arc::new(CachedFeed::new(live, refresh))
        }
        _ => {
            warn!("No price oracle configured, serving simulated rates");
            Arc::new(offline_feed())
        }
    };

    let gateway = Arc::new(LedgerGateway::new(
        ledger.clone(),
        market.clone(),
        Arc::new(SystemClock),
        supported,
        node_config.limits.clone(),
    ));

    let monitor = MonitorService::new(ledger.clone(), market.clone(), refresh);
    tokio::spawn(async move {
        monitor.run().await;
    });

    let api_state = AppState::new(gateway, market, node_config.limits.clone());
    let listen_addr = node_config.listen_addr;
    tokio::spawn(async move {
        if let Err(e) = hedge_api::start_server(api_state, listen_addr).await {
            error!("API server stopped: {}", e);
        }
    });

    info!("Node running. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;

    ledger.save().context("Failed to save ledger on shutdown")?;
    info!("Ledger saved, bye");
    Ok(())
}
