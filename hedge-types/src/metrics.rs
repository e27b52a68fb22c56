use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregated protection figures shown on the dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ProtectionMetrics {
    /// USD value protected so far.
    pub total_protected: Decimal,
    /// Devaluation of the local currency over the requested window, in percent.
    pub currency_devaluation: Decimal,
    pub conversion_count: u32,
    pub average_protection: Decimal,
}
