//! The contract boundary. `ContractGateway` is what the dashboard calls;
//! `LedgerGateway` answers those calls against the in-process ledger.

pub mod clock;
pub mod ledger_gateway;

use async_trait::async_trait;
use hedge_engine::HedgeError;
use hedge_types::{Address, ConversionEvent, CurrencyCode, ProtectionMetrics, UserConfiguration, Window};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ledger_gateway::LedgerGateway;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SetupReceipt {
    pub success: bool,
    /// Threshold as it was encoded for the contract.
    pub threshold_bp: i128,
    pub submitted_at: u64,
}

#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Fails with `SimulationError` when the contract would reject the call
    /// and `SubmissionError` when it could not be recorded.
    async fn submit_setup(&self, user: &Address, config: &UserConfiguration) -> Result<SetupReceipt, HedgeError>;

    async fn query_config(&self, user: &Address) -> Result<Option<UserConfiguration>, HedgeError>;

    async fn query_metrics(&self, user: &Address, window: Window) -> Result<ProtectionMetrics, HedgeError>;

    async fn list_supported_currencies(&self) -> Result<BTreeSet<CurrencyCode>, HedgeError>;

    /// Oldest first.
    async fn conversion_history(&self, user: &Address) -> Result<Vec<ConversionEvent>, HedgeError>;

    /// Deposit a salary; converts the configured share if the trigger fires.
    async fn process_salary(&self, user: &Address, amount: Decimal) -> Result<Option<ConversionEvent>, HedgeError>;

    async fn convert_now(&self, user: &Address, amount: Decimal) -> Result<ConversionEvent, HedgeError>;

    async fn rebalance(
        &self,
        user: &Address,
        local_holdings: Decimal,
        usd_holdings: Decimal,
    ) -> Result<Option<ConversionEvent>, HedgeError>;
}
