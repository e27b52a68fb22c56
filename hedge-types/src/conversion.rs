use crate::config::UserConfiguration;
use crate::currency::Address;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TriggerReason {
    /// Fired by the devaluation trigger while processing a salary.
    Automatic,
    /// Requested directly by the user.
    Manual,
    /// Restores the target USD share of the user's holdings.
    Rebalance,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerReason::Automatic => "automatic",
            TriggerReason::Manual => "manual",
            TriggerReason::Rebalance => "rebalance",
        };
        f.write_str(s)
    }
}

/// An executed conversion. Never mutated after it is recorded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversionEvent {
    pub date: NaiveDate,
    pub local_amount: Decimal,
    pub usd_amount: Decimal,
    pub exchange_rate: Decimal,
    pub trigger_reason: TriggerReason,
}

/// Per-user record kept by the contract alongside the configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProtectionRecord {
    pub user: Address,
    pub config: UserConfiguration,
    /// Unix seconds of the last executed conversion.
    pub last_conversion: Option<u64>,
    /// USD protected before the retained history window.
    pub baseline_protected: Decimal,
    /// Conversions folded into `baseline_protected`.
    pub baseline_conversions: u32,
}

impl ProtectionRecord {
    pub fn new(user: Address, config: UserConfiguration) -> Self {
        Self {
            user,
            config,
            last_conversion: None,
            baseline_protected: Decimal::ZERO,
            baseline_conversions: 0,
        }
    }
}
