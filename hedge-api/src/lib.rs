//! JSON API over a [`ContractGateway`] and a market feed.

pub mod error;
pub mod telemetry;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use error::ApiError;
use hedge_engine::{evaluate_snapshot, validate, ConfigDraft, HedgeError, TriggerDecision};
use hedge_gateway::{ContractGateway, SetupReceipt};
use hedge_oracles::MarketDataProvider;
use hedge_types::{
    Address, ConversionEvent, CurrencyCode, CurrencyInfo, MarketSnapshot, ProtectionLimits, ProtectionMetrics,
    UserConfiguration, Window,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use telemetry::Telemetry;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn ContractGateway>,
    pub market: Arc<dyn MarketDataProvider>,
    pub limits: ProtectionLimits,
    pub telemetry: Arc<Telemetry>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        market: Arc<dyn MarketDataProvider>,
        limits: ProtectionLimits,
    ) -> Self {
        Self { gateway, market, limits, telemetry: Arc::new(Telemetry::new()) }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrencyEntry {
    pub code: CurrencyCode,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SetupRequest {
    pub user: Address,
    pub currency: Option<CurrencyCode>,
    pub percentage: Option<u32>,
    pub threshold: Option<Decimal>,
}

impl SetupRequest {
    pub fn draft(&self) -> ConfigDraft {
        ConfigDraft {
            currency: self.currency.clone(),
            percentage: self.percentage,
            threshold: self.threshold,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SetupResponse {
    pub receipt: SetupReceipt,
    pub config: UserConfiguration,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AmountRequest {
    pub user: Address,
    pub amount: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RebalanceRequest {
    pub user: Address,
    pub local_holdings: Decimal,
    pub usd_holdings: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub currency: CurrencyCode,
    pub window: Window,
    pub decision: TriggerDecision,
    pub recommends_protection: bool,
}

#[derive(Deserialize, Default)]
pub struct WindowQuery {
    pub window: Option<String>,
}

impl WindowQuery {
    fn window(&self) -> Result<Window, ApiError> {
        match &self.window {
            None => Ok(Window::default()),
            Some(raw) => raw.parse().map_err(ApiError::BadRequest),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/currencies", get(currencies))
        .route("/market/:currency", get(market))
        .route("/setup", post(setup))
        .route("/config/:user", get(config))
        .route("/metrics", get(prometheus))
        .route("/metrics/:user", get(metrics))
        .route("/history/:user", get(history))
        .route("/evaluate/:user", get(evaluate))
        .route("/salary", post(salary))
        .route("/convert", post(convert))
        .route("/rebalance", post(rebalance))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", addr);
    axum::serve(listener, app).await
}

async fn root() -> &'static str {
    "Hedge API v0.1"
}

async fn currencies(State(state): State<AppState>) -> Result<Json<Vec<CurrencyEntry>>, ApiError> {
    let supported = state.gateway.list_supported_currencies().await?;
    let entries = supported
        .into_iter()
        .map(|code| {
            let name = CurrencyInfo::lookup(&code)
                .map(|info| info.name.to_string())
                .unwrap_or_else(|| code.to_string());
            CurrencyEntry { code, name }
        })
        .collect();
    Ok(Json(entries))
}

async fn market(
    State(state): State<AppState>,
    Path(currency): Path<String>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    let snapshot = state.market.fetch(&CurrencyCode::new(&currency)).await?;
    Ok(Json(snapshot))
}

async fn setup(
    State(state): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<SetupResponse>, ApiError> {
    let supported = state.gateway.list_supported_currencies().await?;
    let config = validate(&req.draft(), &supported, &state.limits)?;

    match state.gateway.submit_setup(&req.user, &config).await {
        Ok(receipt) => {
            state.telemetry.setup(true);
            Ok(Json(SetupResponse { receipt, config }))
        }
        Err(e) => {
            warn!(user = %req.user.short(), error = %e, "setup rejected");
            state.telemetry.setup(false);
            Err(e.into())
        }
    }
}

async fn config(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<UserConfiguration>, ApiError> {
    let user = Address::new(&user);
    match state.gateway.query_config(&user).await? {
        Some(cfg) => Ok(Json(cfg)),
        None => Err(HedgeError::UserNotFound(user.to_string()).into()),
    }
}

async fn prometheus(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .telemetry
        .render()
        .map_err(|_| ApiError::Internal("metrics encoding failed".to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
        body,
    ))
}

async fn metrics(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ProtectionMetrics>, ApiError> {
    let window = query.window()?;
    let metrics = state.gateway.query_metrics(&Address::new(&user), window).await?;
    Ok(Json(metrics))
}

async fn history(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Vec<ConversionEvent>>, ApiError> {
    let events = state.gateway.conversion_history(&Address::new(&user)).await?;
    Ok(Json(events))
}

async fn evaluate(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Evaluation>, ApiError> {
    let window = query.window()?;
    let user = Address::new(&user);
    let config = state
        .gateway
        .query_config(&user)
        .await?
        .ok_or_else(|| HedgeError::UserNotFound(user.to_string()))?;

    let snapshot = state.market.fetch(&config.currency).await?;
    let decision = evaluate_snapshot(&snapshot, window, &config)?;
    state.telemetry.evaluation(decision.triggered);

    Ok(Json(Evaluation {
        currency: config.currency,
        window,
        decision,
        recommends_protection: decision.recommends_protection(),
    }))
}

async fn salary(
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Option<ConversionEvent>>, ApiError> {
    let event = state.gateway.process_salary(&req.user, req.amount).await?;
    if let Some(e) = &event {
        state.telemetry.conversion(e.trigger_reason);
    }
    Ok(Json(event))
}

async fn convert(
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<ConversionEvent>, ApiError> {
    let event = state.gateway.convert_now(&req.user, req.amount).await?;
    state.telemetry.conversion(event.trigger_reason);
    Ok(Json(event))
}

async fn rebalance(
    State(state): State<AppState>,
    Json(req): Json<RebalanceRequest>,
) -> Result<Json<Option<ConversionEvent>>, ApiError> {
    let event = state
        .gateway
        .rebalance(&req.user, req.local_holdings, req.usd_holdings)
        .await?;
    if let Some(e) = &event {
        state.telemetry.conversion(e.trigger_reason);
    }
    Ok(Json(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use hedge_gateway::{FixedClock, LedgerGateway};
    use hedge_oracles::StaticFeed;
    use hedge_storage::Ledger;
    use tower::ServiceExt;

    const ALICE: &str = "GDNDD6KLDSDL3A5BGG2CIQ56E5GBVXMJCFAKBZ7J3INF4N4ETVDFUKJT";

    fn app() -> Router {
        let market = Arc::new(StaticFeed::demo());
        let supported = ["MXN", "ARS"].iter().map(|c| CurrencyCode::new(c)).collect();
        let gateway = LedgerGateway::new(
            Arc::new(Ledger::in_memory()),
            market.clone(),
            Arc::new(FixedClock::new(1_705_300_000)),
            supported,
            ProtectionLimits::default(),
        );
        router(AppState::new(Arc::new(gateway), market, ProtectionLimits::default()))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn mxn_setup() -> serde_json::Value {
        serde_json::json!({ "user": ALICE, "currency": "MXN", "percentage": 25, "threshold": "2.0" })
    }

    #[tokio::test]
    async fn lists_supported_currencies() {
        let app = app();
        let (status, body) = send(&app, get("/currencies")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["code"], "ARS");
        assert_eq!(body[1]["name"], "Mexican Peso");
    }

    #[tokio::test]
    async fn setup_then_evaluate() {
        let app = app();
        let (status, body) = send(&app, post("/setup", mxn_setup())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["receipt"]["threshold_bp"], 200);

        let (status, body) = send(&app, get(&format!("/evaluate/{}", ALICE))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommends_protection"], true);
        assert_eq!(body["window"], "week");

        let resp = app.clone().oneshot(get("/metrics")).await.unwrap();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("hedge_trigger_evaluations_total{outcome=\"triggered\"} 1"));
    }

    #[tokio::test]
    async fn invalid_setup_names_the_field() {
        let app = app();
        let mut req = mxn_setup();
        req["threshold"] = serde_json::json!("6.0");
        let (status, body) = send(&app, post("/setup", req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "threshold");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = app();
        let (status, _) = send(&app, get(&format!("/config/{}", ALICE))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get(&format!("/metrics/{}", ALICE))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn salary_converts_and_shows_in_history() {
        let app = app();
        send(&app, post("/setup", mxn_setup())).await;

        let (status, body) = send(
            &app,
            post("/salary", serde_json::json!({ "user": ALICE, "amount": "10000" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trigger_reason"], "automatic");

        let (_, history) = send(&app, get(&format!("/history/{}", ALICE))).await;
        assert_eq!(history.as_array().map(|a| a.len()), Some(1));

        let (status, metrics) = send(&app, get(&format!("/metrics/{}?window=month", ALICE))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(metrics["conversion_count"], 1);
    }

    #[tokio::test]
    async fn bad_window_and_amount_are_rejected() {
        let app = app();
        send(&app, post("/setup", mxn_setup())).await;

        let (status, _) = send(&app, get(&format!("/metrics/{}?window=year", ALICE))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, post("/convert", serde_json::json!({ "user": ALICE, "amount": "-5" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn decimal(v: &serde_json::Value) -> Option<Decimal> {
        v.as_str().and_then(|s| s.parse().ok())
    }

    #[tokio::test]
    async fn market_snapshot_for_quoted_currency() {
        let app = app();
        let (status, body) = send(&app, get("/market/mxn")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&body["current"]), Some(Decimal::new(1745, 2)));
        assert_eq!(decimal(&body["week_ago"]), Some(Decimal::new(1698, 2)));
    }

    #[tokio::test]
    async fn rebalance_converts_the_shortfall() {
        let app = app();
        send(&app, post("/setup", mxn_setup())).await;

        let req = serde_json::json!({ "user": ALICE, "local_holdings": "17450", "usd_holdings": "0" });
        let (status, body) = send(&app, post("/rebalance", req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trigger_reason"], "rebalance");
        assert_eq!(decimal(&body["usd_amount"]), Some(Decimal::from(250)));

        let req = serde_json::json!({ "user": ALICE, "local_holdings": "17450", "usd_holdings": "1000" });
        let (status, body) = send(&app, post("/rebalance", req)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn missing_rates_are_bad_gateway() {
        let app = app();
        let (status, body) = send(&app, get("/market/ARS")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["retryable"], true);
    }
}
