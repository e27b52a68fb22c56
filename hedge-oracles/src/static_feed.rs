use crate::MarketDataProvider;
use async_trait::async_trait;
use hedge_engine::HedgeError;
use hedge_types::{CurrencyCode, MarketSnapshot, Window};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

/// Devaluation used when no live oracle is available: 0.25% a day, with
/// fixed figures for the standard windows.
pub fn simulated_devaluation(days: u32) -> Decimal {
    match days {
        1 => Decimal::new(25, 2),
        7 => Decimal::new(18, 1),
        30 => Decimal::new(52, 1),
        _ => Decimal::from(days) * Decimal::new(25, 2),
    }
}

/// Fixed rate table. Used by tests, the simulator and the node's offline mode.
#[derive(Default)]
pub struct StaticFeed {
    snapshots: RwLock<HashMap<CurrencyCode, MarketSnapshot>>,
    simulated: bool,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(self, currency: &str, snapshot: MarketSnapshot) -> Self {
        if let Ok(mut guard) = self.snapshots.write() {
            guard.insert(CurrencyCode::new(currency), snapshot);
        }
        self
    }

    /// The rates the dashboard was demoed with.
    pub fn demo() -> Self {
        Self::new().with_snapshot(
            "MXN",
            MarketSnapshot {
                current: Decimal::new(1745, 2),
                week_ago: Decimal::new(1698, 2),
                month_ago: Decimal::new(1685, 2),
                timestamp: 1_705_300_000,
            },
        )
    }

    /// One snapshot per `(currency, current rate)`, back-filled so the week
    /// and month references match [`simulated_devaluation`].
    pub fn simulated(rates: &[(&str, Decimal)], timestamp: u64) -> Self {
        let back = |current: Decimal, days: u32| {
            let factor = Decimal::ONE + simulated_devaluation(days) / Decimal::ONE_HUNDRED;
            (current / factor).round_dp(6)
        };
        let mut feed = Self::new();
        for (code, current) in rates {
            feed = feed.with_snapshot(
                code,
                MarketSnapshot {
                    current: *current,
                    week_ago: back(*current, 7),
                    month_ago: back(*current, 30),
                    timestamp,
                },
            );
        }
        feed.simulated = true;
        feed
    }

    /// Swap in a new snapshot, as a periodic refresh would.
    pub fn update(&self, currency: &CurrencyCode, snapshot: MarketSnapshot) {
        if let Ok(mut guard) = self.snapshots.write() {
            guard.insert(currency.clone(), snapshot);
        }
    }
}

#[async_trait]
impl MarketDataProvider for StaticFeed {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<MarketSnapshot, HedgeError> {
        let guard = self
            .snapshots
            .read()
            .map_err(|_| HedgeError::GatewayUnavailable("rate table poisoned".to_string()))?;
        guard
            .get(currency)
            .cloned()
            .ok_or_else(|| HedgeError::GatewayUnavailable(format!("no rates for {}", currency)))
    }

    async fn devaluation(&self, currency: &CurrencyCode, window: Window) -> Result<Decimal, HedgeError> {
        let snapshot = self.fetch(currency).await?;
        if self.simulated {
            return Ok(simulated_devaluation(window.days()));
        }
        hedge_engine::devaluation_percent(snapshot.current, snapshot.sample(window).rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn simulated_table() {
        assert_eq!(simulated_devaluation(1), dec!(0.25));
        assert_eq!(simulated_devaluation(7), dec!(1.8));
        assert_eq!(simulated_devaluation(30), dec!(5.2));
        assert_eq!(simulated_devaluation(14), dec!(3.5));
    }

    #[tokio::test]
    async fn demo_feed_quotes_mxn_only() {
        let feed = StaticFeed::demo();
        let snap = feed.fetch(&CurrencyCode::new("MXN")).await.unwrap();
        assert_eq!(snap.week_ago, dec!(16.98));
        assert!(matches!(
            feed.fetch(&CurrencyCode::new("ARS")).await,
            Err(HedgeError::GatewayUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn demo_devaluation_comes_from_rates() {
        let feed = StaticFeed::demo();
        let weekly = feed.devaluation(&CurrencyCode::new("MXN"), Window::Week).await.unwrap();
        assert_eq!(weekly.round_dp(2), dec!(2.77));
    }

    #[tokio::test]
    async fn simulated_feed_uses_table() {
        let feed = StaticFeed::simulated(&[("ARS", dec!(1000))], 1_000);
        let ars = CurrencyCode::new("ARS");
        assert_eq!(feed.devaluation(&ars, Window::Day).await.unwrap(), dec!(0.25));
        assert_eq!(feed.devaluation(&ars, Window::Month).await.unwrap(), dec!(5.2));

        let snap = feed.fetch(&ars).await.unwrap();
        assert_eq!(snap.week_ago, dec!(982.318271));
    }

    #[tokio::test]
    async fn update_replaces_snapshot() {
        let feed = StaticFeed::demo();
        let mxn = CurrencyCode::new("MXN");
        let mut snap = feed.fetch(&mxn).await.unwrap();
        snap.current = dec!(18.00);
        feed.update(&mxn, snap);
        assert_eq!(feed.fetch(&mxn).await.unwrap().current, dec!(18.00));
    }
}
