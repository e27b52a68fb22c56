use crate::clock::Clock;
use crate::{ContractGateway, SetupReceipt};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use hedge_engine::{
    aggregate, plan_manual_conversion, plan_rebalance, plan_salary_conversion, ConversionPlan, HedgeError,
};
use hedge_oracles::MarketDataProvider;
use hedge_storage::Ledger;
use hedge_types::{
    Address, ConversionEvent, CurrencyCode, ProtectionLimits, ProtectionMetrics, ProtectionRecord,
    UserConfiguration, Window,
};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

// Bounds the deployed contract enforces. The setup form is stricter.
const MAX_CONTRACT_PERCENTAGE: u32 = 50;
const MIN_THRESHOLD_BP: i128 = 50;
const MAX_THRESHOLD_BP: i128 = 1000;

pub struct LedgerGateway {
    ledger: Arc<Ledger>,
    market: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    supported: BTreeSet<CurrencyCode>,
    limits: ProtectionLimits,
    /// One lock per user; record-changing calls run one at a time per user.
    user_locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl LedgerGateway {
    pub fn new(
        ledger: Arc<Ledger>,
        market: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
        supported: BTreeSet<CurrencyCode>,
        limits: ProtectionLimits,
    ) -> Self {
        Self {
            ledger,
            market,
            clock,
            supported,
            limits,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user: &Address) -> Arc<Mutex<()>> {
        self.user_locks.lock().await.entry(user.clone()).or_default().clone()
    }

    /// Dry run of `setup_protection`: the checks the contract performs.
    pub fn simulate_setup(&self, config: &UserConfiguration) -> Result<(), HedgeError> {
        if config.target_percentage > MAX_CONTRACT_PERCENTAGE {
            return Err(HedgeError::SimulationError("InvalidPercentage".to_string()));
        }
        let bp = config.threshold_bp();
        if !(MIN_THRESHOLD_BP..=MAX_THRESHOLD_BP).contains(&bp) {
            return Err(HedgeError::SimulationError("InvalidThreshold".to_string()));
        }
        if !self.supported.contains(&config.currency) {
            return Err(HedgeError::SimulationError("InvalidCurrency".to_string()));
        }
        Ok(())
    }

    fn load_record(&self, user: &Address) -> Result<ProtectionRecord, HedgeError> {
        self.ledger
            .record(user)
            .map_err(|e| HedgeError::GatewayUnavailable(e.to_string()))?
            .ok_or_else(|| HedgeError::UserNotFound(user.to_string()))
    }

    fn persist(&self) {
        if let Err(e) = self.ledger.save() {
            warn!("Failed to save ledger snapshot: {}", e);
        }
    }

    fn date_of(timestamp: u64) -> NaiveDate {
        DateTime::from_timestamp(i64::try_from(timestamp).unwrap_or(i64::MAX), 0)
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }

    fn execute(&self, user: &Address, plan: ConversionPlan) -> Result<ConversionEvent, HedgeError> {
        let now = self.clock.now();
        let event = plan.into_event(Self::date_of(now));
        self.ledger
            .record_conversion(user, event.clone(), now)
            .map_err(|e| HedgeError::SubmissionError(e.to_string()))?;
        self.persist();

        info!(
            "Conversion for {}: {} local -> {} USD @ {} ({})",
            user.short(),
            event.local_amount,
            event.usd_amount,
            event.exchange_rate,
            event.trigger_reason
        );
        Ok(event)
    }
}

#[async_trait]
impl ContractGateway for LedgerGateway {
    async fn submit_setup(&self, user: &Address, config: &UserConfiguration) -> Result<SetupReceipt, HedgeError> {
        self.simulate_setup(config)?;

        let lock = self.user_lock(user).await;
        let _guard = lock.lock().await;
        let existing = self
            .ledger
            .record(user)
            .map_err(|e| HedgeError::SubmissionError(e.to_string()))?;
        let record = match existing {
            Some(prev) => ProtectionRecord {
                config: config.clone(),
                ..prev
            },
            None => ProtectionRecord::new(user.clone(), config.clone()),
        };

        self.ledger
            .put_record(record)
            .map_err(|e| HedgeError::SubmissionError(e.to_string()))?;
        self.persist();

        info!(
            "Protection set up for {}: {} {}% @ {} bp",
            user.short(),
            config.currency,
            config.target_percentage,
            config.threshold_bp()
        );
        Ok(SetupReceipt {
            success: true,
            threshold_bp: config.threshold_bp(),
            submitted_at: self.clock.now(),
        })
    }

    async fn query_config(&self, user: &Address) -> Result<Option<UserConfiguration>, HedgeError> {
        let record = self
            .ledger
            .record(user)
            .map_err(|e| HedgeError::GatewayUnavailable(e.to_string()))?;
        Ok(record.map(|r| r.config))
    }

    async fn query_metrics(&self, user: &Address, window: Window) -> Result<ProtectionMetrics, HedgeError> {
        let record = self.load_record(user)?;
        let events = self
            .ledger
            .events(user)
            .map_err(|e| HedgeError::GatewayUnavailable(e.to_string()))?;
        let devaluation = self.market.devaluation(&record.config.currency, window).await?;
        Ok(aggregate(&events, record.baseline_protected, record.baseline_conversions, devaluation))
    }

    async fn list_supported_currencies(&self) -> Result<BTreeSet<CurrencyCode>, HedgeError> {
        Ok(self.supported.clone())
    }

    async fn conversion_history(&self, user: &Address) -> Result<Vec<ConversionEvent>, HedgeError> {
        self.ledger
            .events(user)
            .map_err(|e| HedgeError::GatewayUnavailable(e.to_string()))
    }

    async fn process_salary(&self, user: &Address, amount: Decimal) -> Result<Option<ConversionEvent>, HedgeError> {
        let lock = self.user_lock(user).await;
        let _guard = lock.lock().await;
        let record = self.load_record(user)?;
        let snapshot = self.market.fetch(&record.config.currency).await?;

        match plan_salary_conversion(&record, amount, &snapshot, self.clock.now(), &self.limits)? {
            Some(plan) => self.execute(user, plan).map(Some),
            None => Ok(None),
        }
    }

    async fn convert_now(&self, user: &Address, amount: Decimal) -> Result<ConversionEvent, HedgeError> {
        let lock = self.user_lock(user).await;
        let _guard = lock.lock().await;
        let record = self.load_record(user)?;
        let snapshot = self.market.fetch(&record.config.currency).await?;
        let plan = plan_manual_conversion(amount, &snapshot)?;
        self.execute(user, plan)
    }

    async fn rebalance(
        &self,
        user: &Address,
        local_holdings: Decimal,
        usd_holdings: Decimal,
    ) -> Result<Option<ConversionEvent>, HedgeError> {
        let lock = self.user_lock(user).await;
        let _guard = lock.lock().await;
        let record = self.load_record(user)?;
        let snapshot = self.market.fetch(&record.config.currency).await?;

        match plan_rebalance(local_holdings, usd_holdings, snapshot.current, record.config.target_percentage)? {
            Some(plan) => self.execute(user, plan).map(Some),
            None => Ok(None),
        }
    }
}
