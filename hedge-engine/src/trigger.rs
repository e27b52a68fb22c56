use crate::error::{ConfigField, HedgeError};
use hedge_types::{MarketSnapshot, UserConfiguration, Window};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of comparing the current rate with a reference rate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TriggerDecision {
    pub triggered: bool,
    /// Signed change in percent. Positive means the local currency weakened.
    pub change_percent: Decimal,
}

impl TriggerDecision {
    pub fn is_depreciation(&self) -> bool {
        self.change_percent > Decimal::ZERO
    }

    /// Only a weakening past the threshold warrants a protective conversion.
    pub fn recommends_protection(&self) -> bool {
        self.triggered && self.is_depreciation()
    }
}

/// Signed percentage change from `reference` to `current`.
pub(crate) fn percentage_change(current: Decimal, reference: Decimal) -> Result<Decimal, HedgeError> {
    if reference <= Decimal::ZERO {
        return Err(HedgeError::InvalidRate(format!(
            "reference rate must be positive, got {}",
            reference
        )));
    }
    if current < Decimal::ZERO {
        return Err(HedgeError::InvalidRate(format!(
            "current rate must not be negative, got {}",
            current
        )));
    }

    current
        .checked_sub(reference)
        .and_then(|delta| delta.checked_div(reference))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| HedgeError::InvalidRate("rate change out of range".to_string()))
}

/// Decide whether the move from `reference` to `current` crosses `threshold`
/// percent in either direction. A change exactly at the threshold triggers.
pub fn evaluate_trigger(
    current: Decimal,
    reference: Decimal,
    threshold: Decimal,
) -> Result<TriggerDecision, HedgeError> {
    let change_percent = percentage_change(current, reference)?;

    if threshold <= Decimal::ZERO {
        return Err(HedgeError::invalid(ConfigField::Threshold, "threshold must be positive"));
    }

    Ok(TriggerDecision {
        triggered: change_percent.abs() >= threshold,
        change_percent,
    })
}

pub fn evaluate_snapshot(
    snapshot: &MarketSnapshot,
    window: Window,
    config: &UserConfiguration,
) -> Result<TriggerDecision, HedgeError> {
    evaluate_trigger(snapshot.current, snapshot.sample(window).rate, config.threshold)
}
