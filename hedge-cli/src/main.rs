mod remote;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hedge_engine::{ConfigDraft, HedgeError};
use hedge_oracles::MarketDataProvider;
use hedge_session::{Dashboard, Operation, Session, View};
use hedge_types::{Address, CurrencyCode, ProtectionLimits, Window};
use remote::{is_node_down, RemoteNode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about = "Hedge CLI: protect salaries against local currency devaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, default_value = "http://localhost:3000")]
    node_url: String,
    #[arg(short, long, default_value = "wallet.json")]
    wallet_path: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Remember the Stellar account to act as
    Init {
        #[arg(long)]
        address: String,
    },
    /// Show current wallet info
    Show,
    /// List supported currencies
    Currencies,
    /// Current and reference rates for a currency
    Market {
        #[arg(long)]
        currency: String,
    },
    /// Configure (or reconfigure) protection
    Setup {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        percentage: Option<u32>,
        #[arg(long)]
        threshold: Option<Decimal>,
    },
    /// Show the stored configuration
    Config,
    /// Protection metrics over a window (day, week, month)
    Metrics {
        #[arg(long, default_value = "week")]
        window: Window,
    },
    /// Past conversions, newest first
    History,
    /// Check the weekly devaluation trigger
    Evaluate,
    /// Deposit a salary
    Salary {
        #[arg(long)]
        amount: Decimal,
    },
    /// Convert an amount of local currency right away
    Convert {
        #[arg(long)]
        amount: Decimal,
    },
    /// Restore the target USD share of your holdings
    Rebalance {
        #[arg(long)]
        local: Decimal,
        #[arg(long)]
        usd: Decimal,
    },
}

#[derive(Serialize, Deserialize)]
struct Wallet {
    public_key: String,
}

impl Wallet {
    fn load(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("No wallet at {:?}, run `hedge-cli init` first", path))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn address(&self) -> Address {
        Address::new(&self.public_key)
    }
}

/// Connect and require an active protection setup.
async fn active_dashboard(dash: &Dashboard, wallet: &Wallet) -> Result<()> {
    match dash.connect(wallet.address()).await? {
        Session::Active { .. } => Ok(()),
        _ => Err(anyhow!("No protection configured for {}, run `hedge-cli setup`", wallet.public_key)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let node_url = cli.node_url.clone();
    run(cli).await.map_err(|e| {
        if e.downcast_ref::<HedgeError>().is_some_and(is_node_down) {
            e.context(format!("Is the hedge node running at {}?", node_url))
        } else {
            e
        }
    })
}

async fn run(cli: Cli) -> Result<()> {
    let node = Arc::new(RemoteNode::new(&cli.node_url));
    let dash = Dashboard::new(node.clone(), node.clone(), ProtectionLimits::default());

    match &cli.command {
        Commands::Init { address } => {
            let wallet = Wallet { public_key: Address::new(address).to_string() };
            wallet.save(&cli.wallet_path)?;
            println!("Wallet initialized at {:?}", cli.wallet_path);
            println!("Public Key: {}", wallet.public_key);
        }
        Commands::Show => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            println!("Wallet: {:?}", cli.wallet_path);
            println!("Public Key: {}", wallet.public_key);
        }
        Commands::Currencies => {
            for c in node.currencies().await? {
                println!("{}  {}", c.code, c.name);
            }
        }
        Commands::Market { currency } => {
            let snap = node.fetch(&CurrencyCode::new(currency)).await?;
            println!("{} per USD: {}", currency.to_uppercase(), snap.current);
            println!("  1 week ago:  {}", snap.week_ago);
            println!("  1 month ago: {}", snap.month_ago);
        }
        Commands::Setup { currency, percentage, threshold } => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            let session = dash.connect(wallet.address()).await?;
            if let Session::Active { .. } = session {
                dash.back_to_setup().await?;
            }

            let limits = dash.limits();
            let draft = ConfigDraft {
                currency: Some(CurrencyCode::new(currency)),
                percentage: Some(percentage.unwrap_or(limits.default_percentage)),
                threshold: Some(threshold.unwrap_or(limits.default_threshold)),
            };
            dash.edit_draft(draft).await?;

            let issues = dash.draft_issues().await?;
            if !issues.is_empty() {
                for issue in &issues {
                    eprintln!("  {}", issue);
                }
                return Err(anyhow!("Configuration is incomplete"));
            }

            dash.submit_setup().await?;
            println!("Submitting...");
            match dash.wait_setup().await {
                Operation::Resolved(receipt) => {
                    println!("Protection active (threshold {} bp)", receipt.threshold_bp);
                }
                Operation::Failed(e) if e.is_retryable() => {
                    return Err(anyhow!("{} (safe to retry)", e));
                }
                Operation::Failed(e) => return Err(e.into()),
                other => return Err(anyhow!("Setup did not complete: {:?}", other)),
            }
        }
        Commands::Config => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            if let Some(config) = dash.session().await.config() {
                println!("Currency:   {}", config.currency);
                println!("Protect:    {}% of each salary", config.target_percentage);
                println!("Threshold:  {}% weekly devaluation", config.threshold);
            }
        }
        Commands::Metrics { window } => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            let m = dash.metrics(*window).await?;
            println!("Total protected:      {} USD", m.total_protected);
            println!("Devaluation ({}d):     {}%", window.days(), m.currency_devaluation.round_dp(2));
            println!("Conversions:          {}", m.conversion_count);
            println!("Average conversion:   {} USD", m.average_protection.round_dp(2));
        }
        Commands::History => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            dash.show(View::History).await?;
            let events = dash.history().await?;
            if events.is_empty() {
                println!("No conversions yet");
            }
            for e in events.iter().rev() {
                println!(
                    "{}  {:>12} -> {:>10} USD  @ {}  ({})",
                    e.date, e.local_amount, e.usd_amount, e.exchange_rate, e.trigger_reason
                );
            }
        }
        Commands::Evaluate => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            let decision = dash.evaluate().await?;
            println!("Weekly change: {}%", decision.change_percent.round_dp(2));
            if decision.recommends_protection() {
                println!("Protection recommended");
            } else if decision.triggered {
                println!("Local currency strengthened past the threshold, no action");
            } else {
                println!("Below threshold, no action");
            }
        }
        Commands::Salary { amount } => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            match dash.deposit_salary(*amount).await? {
                Some(e) => println!("Converted {} -> {} USD @ {}", e.local_amount, e.usd_amount, e.exchange_rate),
                None => println!("Salary recorded, no conversion triggered"),
            }
        }
        Commands::Convert { amount } => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            let e = dash.convert_now(*amount).await?;
            println!("Converted {} -> {} USD @ {}", e.local_amount, e.usd_amount, e.exchange_rate);
        }
        Commands::Rebalance { local, usd } => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            active_dashboard(&dash, &wallet).await?;
            match dash.rebalance(*local, *usd).await? {
                Some(e) => println!("Rebalanced {} -> {} USD", e.local_amount, e.usd_amount),
                None => println!("Already at or above target"),
            }
        }
    }

    Ok(())
}
