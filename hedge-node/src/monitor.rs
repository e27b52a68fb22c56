use hedge_engine::{evaluate_snapshot, HedgeError, TriggerDecision};
use hedge_oracles::MarketDataProvider;
use hedge_storage::Ledger;
use hedge_types::{Address, CurrencyCode, MarketSnapshot, Window};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub user: Address,
    pub currency: CurrencyCode,
    pub decision: TriggerDecision,
}

/// Periodically refreshes rates for every configured currency and flags users
/// whose weekly evaluation recommends protection.
pub struct MonitorService {
    ledger: Arc<Ledger>,
    market: Arc<dyn MarketDataProvider>,
    period: Duration,
}

impl MonitorService {
    pub fn new(ledger: Arc<Ledger>, market: Arc<dyn MarketDataProvider>, period: Duration) -> Self {
        Self { ledger, market, period }
    }

    pub async fn run(self) {
        info!("Starting monitor, refreshing every {}s", self.period.as_secs());
        let mut interval = tokio::time::interval(self.period);
        loop {
            interval.tick().await;
            let flagged = self.cycle().await;
            if !flagged.is_empty() {
                info!("Monitor: {} user(s) should protect", flagged.len());
            }
        }
    }

    pub async fn cycle(&self) -> Vec<Recommendation> {
        let users = match self.ledger.users() {
            Ok(users) => users,
            Err(e) => {
                warn!("Monitor: cannot list users: {}", e);
                return Vec::new();
            }
        };

        let mut snapshots: HashMap<CurrencyCode, Result<MarketSnapshot, HedgeError>> = HashMap::new();
        let mut flagged = Vec::new();

        for user in users {
            let record = match self.ledger.record(&user) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(user = %user.short(), "Monitor: cannot load record: {}", e);
                    continue;
                }
            };
            let currency = record.config.currency.clone();

            if !snapshots.contains_key(&currency) {
                let fetched = self.market.fetch(&currency).await;
                snapshots.insert(currency.clone(), fetched);
            }
            let snapshot = match snapshots.get(&currency) {
                Some(Ok(s)) => s,
                Some(Err(e)) => {
                    warn!(%currency, "Monitor: skipping {}: {}", user.short(), e);
                    continue;
                }
                None => continue,
            };

            match evaluate_snapshot(snapshot, Window::Week, &record.config) {
                Ok(decision) if decision.recommends_protection() => {
                    info!(
                        user = %user.short(),
                        %currency,
                        change = %decision.change_percent.round_dp(2),
                        threshold = %record.config.threshold,
                        "Protection recommended"
                    );
                    flagged.push(Recommendation { user, currency, decision });
                }
                Ok(decision) => {
                    debug!(user = %user.short(), change = %decision.change_percent.round_dp(2), "No action");
                }
                Err(e) => warn!(user = %user.short(), "Monitor: evaluation skipped: {}", e),
            }
        }

        flagged
    }
}
