use crate::currency::CurrencyCode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A validated protection setup. Build one through the engine's validator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserConfiguration {
    pub currency: CurrencyCode,
    /// Share of each salary converted to USD, in whole percent.
    pub target_percentage: u32,
    /// Devaluation, in percent, at which an automatic conversion fires.
    pub threshold: Decimal,
}

impl UserConfiguration {
    /// Threshold encoded for the contract: `floor(threshold * 100)`.
    pub fn threshold_bp(&self) -> i128 {
        (self.threshold * Decimal::ONE_HUNDRED)
            .floor()
            .to_i128()
            .unwrap_or(i128::MAX)
    }

    pub fn from_threshold_bp(currency: CurrencyCode, target_percentage: u32, threshold_bp: i128) -> Self {
        Self {
            currency,
            target_percentage,
            threshold: Decimal::from_i128_with_scale(threshold_bp, 2).normalize(),
        }
    }
}

/// Bounds enforced by the setup form and the conversion planner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProtectionLimits {
    pub min_percentage: u32,
    pub max_percentage: u32,
    pub default_percentage: u32,
    pub min_threshold: Decimal,
    pub max_threshold: Decimal,
    pub default_threshold: Decimal,
    pub cooldown_days: u64,
}

impl Default for ProtectionLimits {
    fn default() -> Self {
        Self {
            min_percentage: 10,
            max_percentage: 50,
            default_percentage: 25,
            min_threshold: Decimal::ONE,
            max_threshold: Decimal::new(50, 1),
            default_threshold: Decimal::TWO,
            cooldown_days: 7,
        }
    }
}

impl ProtectionLimits {
    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_days.saturating_mul(crate::SECONDS_PER_DAY)
    }
}
