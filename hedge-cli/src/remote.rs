use async_trait::async_trait;
use hedge_api::{AmountRequest, CurrencyEntry, RebalanceRequest, SetupRequest, SetupResponse};
use hedge_engine::{ConfigField, HedgeError};
use hedge_gateway::{ContractGateway, SetupReceipt};
use hedge_oracles::MarketDataProvider;
use hedge_types::{
    Address, ConversionEvent, CurrencyCode, MarketSnapshot, ProtectionMetrics, UserConfiguration, Window,
};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Deserialize, Debug)]
pub struct ErrorReply {
    pub error: String,
    pub kind: String,
    pub detail: Option<String>,
    pub field: Option<ConfigField>,
}

impl ErrorReply {
    pub fn into_error(self) -> HedgeError {
        let detail = self.detail.unwrap_or(self.error);
        match self.kind.as_str() {
            "invalid_configuration" => HedgeError::invalid(self.field.unwrap_or(ConfigField::Currency), detail),
            "invalid_rate" => HedgeError::InvalidRate(detail),
            "invalid_amount" | "bad_request" => HedgeError::InvalidAmount(detail),
            "simulation_error" => HedgeError::SimulationError(detail),
            "submission_error" => HedgeError::SubmissionError(detail),
            "user_not_found" => HedgeError::UserNotFound(detail),
            "submission_in_flight" => HedgeError::SubmissionInFlight,
            "cancelled" => HedgeError::Cancelled,
            _ => HedgeError::GatewayUnavailable(detail),
        }
    }
}

/// Gateway and market feed backed by a running hedge node.
pub struct RemoteNode {
    base_url: String,
    client: Client,
}

impl RemoteNode {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, HedgeError> {
        let resp = req
            .send()
            .await
            .map_err(|e| HedgeError::GatewayUnavailable(format!("node unreachable: {}", e)))?;
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| HedgeError::GatewayUnavailable(format!("malformed reply: {}", e)));
        }
        match resp.json::<ErrorReply>().await {
            Ok(reply) => Err(reply.into_error()),
            Err(_) => Err(HedgeError::GatewayUnavailable(format!("node returned {}", status))),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HedgeError> {
        self.call(self.client.get(self.url(path))).await
    }

    pub async fn currencies(&self) -> Result<Vec<CurrencyEntry>, HedgeError> {
        self.get("/currencies").await
    }
}

#[async_trait]
impl ContractGateway for RemoteNode {
    async fn submit_setup(&self, user: &Address, config: &UserConfiguration) -> Result<SetupReceipt, HedgeError> {
        let body = SetupRequest {
            user: user.clone(),
            currency: Some(config.currency.clone()),
            percentage: Some(config.target_percentage),
            threshold: Some(config.threshold),
        };
        let reply: SetupResponse = self.call(self.client.post(self.url("/setup")).json(&body)).await?;
        Ok(reply.receipt)
    }

    async fn query_config(&self, user: &Address) -> Result<Option<UserConfiguration>, HedgeError> {
        match self.get(&format!("/config/{}", user)).await {
            Ok(config) => Ok(Some(config)),
            Err(HedgeError::UserNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query_metrics(&self, user: &Address, window: Window) -> Result<ProtectionMetrics, HedgeError> {
        self.get(&format!("/metrics/{}?window={}", user, window.days())).await
    }

    async fn list_supported_currencies(&self) -> Result<BTreeSet<CurrencyCode>, HedgeError> {
        Ok(self.currencies().await?.into_iter().map(|c| c.code).collect())
    }

    async fn conversion_history(&self, user: &Address) -> Result<Vec<ConversionEvent>, HedgeError> {
        self.get(&format!("/history/{}", user)).await
    }

    async fn process_salary(&self, user: &Address, amount: Decimal) -> Result<Option<ConversionEvent>, HedgeError> {
        let body = AmountRequest { user: user.clone(), amount };
        self.call(self.client.post(self.url("/salary")).json(&body)).await
    }

    async fn convert_now(&self, user: &Address, amount: Decimal) -> Result<ConversionEvent, HedgeError> {
        let body = AmountRequest { user: user.clone(), amount };
        self.call(self.client.post(self.url("/convert")).json(&body)).await
    }

    async fn rebalance(
        &self,
        user: &Address,
        local_holdings: Decimal,
        usd_holdings: Decimal,
    ) -> Result<Option<ConversionEvent>, HedgeError> {
        let body = RebalanceRequest { user: user.clone(), local_holdings, usd_holdings };
        self.call(self.client.post(self.url("/rebalance")).json(&body)).await
    }
}

#[async_trait]
impl MarketDataProvider for RemoteNode {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<MarketSnapshot, HedgeError> {
        self.get(&format!("/market/{}", currency)).await
    }
}

/// The node itself could not be reached, as opposed to an upstream outage.
pub fn is_node_down(e: &HedgeError) -> bool {
    matches!(e, HedgeError::GatewayUnavailable(msg) if msg.starts_with("node unreachable"))
}
