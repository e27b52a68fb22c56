use crate::MarketDataProvider;
use async_trait::async_trait;
use hedge_engine::HedgeError;
use hedge_types::{CurrencyCode, MarketSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Keeps each currency's last snapshot for `ttl` so dashboard reads between
/// refresh cycles do not reach the oracle. Devaluation is computed from the
/// cached snapshot.
pub struct CachedFeed {
    inner: Arc<dyn MarketDataProvider>,
    ttl: Duration,
    entries: RwLock<HashMap<CurrencyCode, (Instant, MarketSnapshot)>>,
}

impl CachedFeed {
    pub fn new(inner: Arc<dyn MarketDataProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop the cached snapshot so the next fetch goes to the oracle.
    pub async fn invalidate(&self, currency: &CurrencyCode) {
        self.entries.write().await.remove(currency);
    }
}

#[async_trait]
impl MarketDataProvider for CachedFeed {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<MarketSnapshot, HedgeError> {
        if let Some((at, snapshot)) = self.entries.read().await.get(currency) {
            if at.elapsed() < self.ttl {
                return Ok(snapshot.clone());
            }
        }

        debug!(%currency, "rate cache miss");
        let snapshot = self.inner.fetch(currency).await?;
        self.entries
            .write()
            .await
            .insert(currency.clone(), (Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }
}
