//! HTTP client for a Reflector-style forex price service.
//!
//! The service quotes each asset in USD as a fixed-point integer scaled by
//! `decimals`. The dashboard works in local currency per USD, so every quote
//! is inverted before it leaves this module.

use crate::MarketDataProvider;
use async_trait::async_trait;
use hedge_engine::HedgeError;
use hedge_types::{CurrencyCode, MarketSnapshot, Window};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ReflectorPrice {
    pub price: i64,
    pub timestamp: u64,
    pub decimals: u32,
}

impl ReflectorPrice {
    /// Local currency units per USD.
    pub fn local_per_usd(&self) -> Result<Decimal, HedgeError> {
        if self.price <= 0 || self.decimals > 28 {
            return Err(HedgeError::InvalidRate(format!(
                "oracle returned price {} with {} decimals",
                self.price, self.decimals
            )));
        }
        let usd_per_local = Decimal::from_i128_with_scale(i128::from(self.price), self.decimals);
        Decimal::ONE
            .checked_div(usd_per_local)
            .map(|rate| rate.round_dp(6))
            .ok_or_else(|| HedgeError::InvalidRate("oracle price out of range".to_string()))
    }
}

pub struct ReflectorFeed {
    base_url: String,
    client: Client,
    supported: BTreeSet<CurrencyCode>,
}

impl ReflectorFeed {
    pub fn new(base_url: &str, supported: BTreeSet<CurrencyCode>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            supported,
        }
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }

    async fn fetch_price(&self, currency: &CurrencyCode, at: Option<u64>) -> Result<ReflectorPrice, HedgeError> {
        let url = match at {
            None => format!("{}/lastprice/{}", self.base_url, currency),
            Some(ts) => format!("{}/price/{}/{}", self.base_url, currency, ts),
        };
        debug!(%url, "fetching oracle price");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HedgeError::GatewayUnavailable(format!("oracle unreachable: {}", e)))?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(HedgeError::GatewayUnavailable(format!("no price for {}", currency)))
            }
            status => {
                warn!(%status, %currency, "oracle returned an error status");
                return Err(HedgeError::GatewayUnavailable(format!("oracle returned {}", status)));
            }
        }

        resp.json::<ReflectorPrice>()
            .await
            .map_err(|e| HedgeError::InvalidRate(format!("malformed oracle response: {}", e)))
    }
}

#[async_trait]
impl MarketDataProvider for ReflectorFeed {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<MarketSnapshot, HedgeError> {
        if !self.supported.contains(currency) {
            return Err(HedgeError::GatewayUnavailable(format!("{} is not quoted by the oracle", currency)));
        }

        let now = Self::now();
        let (current, week, month) = tokio::try_join!(
            self.fetch_price(currency, None),
            self.fetch_price(currency, Some(now.saturating_sub(Window::Week.seconds()))),
            self.fetch_price(currency, Some(now.saturating_sub(Window::Month.seconds()))),
        )?;

        Ok(MarketSnapshot {
            current: current.local_per_usd()?,
            week_ago: week.local_per_usd()?,
            month_ago: month.local_per_usd()?,
            timestamp: current.timestamp,
        })
    }
}
