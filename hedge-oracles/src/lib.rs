//! Market data providers: where the dashboard gets its exchange rates.

pub mod cache;
pub mod reflector;
pub mod static_feed;

use async_trait::async_trait;
use hedge_engine::{devaluation_percent, HedgeError};
use hedge_types::{CurrencyCode, MarketSnapshot, Window};
use rust_decimal::Decimal;

pub use cache::CachedFeed;
pub use reflector::ReflectorFeed;
pub use static_feed::{simulated_devaluation, StaticFeed};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current, week-old and month-old rates for `currency` (local per USD).
    /// Fails with `GatewayUnavailable` if the oracle is unreachable or does
    /// not quote the currency.
    async fn fetch(&self, currency: &CurrencyCode) -> Result<MarketSnapshot, HedgeError>;

    /// Devaluation over `window`, in percent.
    async fn devaluation(&self, currency: &CurrencyCode, window: Window) -> Result<Decimal, HedgeError> {
        let snapshot = self.fetch(currency).await?;
        devaluation_percent(snapshot.current, snapshot.sample(window).rate)
    }
}
