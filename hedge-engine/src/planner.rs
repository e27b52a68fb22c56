use crate::error::HedgeError;
use crate::trigger::{evaluate_snapshot, TriggerDecision};
use chrono::NaiveDate;
use hedge_types::{
    ConversionEvent, MarketSnapshot, ProtectionLimits, ProtectionRecord, TriggerReason, Window,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A conversion that should be executed, before it becomes an event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    pub local_amount: Decimal,
    pub usd_amount: Decimal,
    pub exchange_rate: Decimal,
    pub reason: TriggerReason,
    pub decision: Option<TriggerDecision>,
}

impl ConversionPlan {
    pub fn into_event(self, date: NaiveDate) -> ConversionEvent {
        ConversionEvent {
            date,
            local_amount: self.local_amount,
            usd_amount: self.usd_amount,
            exchange_rate: self.exchange_rate,
            trigger_reason: self.reason,
        }
    }
}

pub fn cooldown_elapsed(last_conversion: Option<u64>, now: u64, cooldown_secs: u64) -> bool {
    match last_conversion {
        None => true,
        Some(last) => now >= last.saturating_add(cooldown_secs),
    }
}

fn out_of_range(what: &str) -> HedgeError {
    HedgeError::InvalidAmount(format!("{} out of range", what))
}

/// `amount * percentage / 100`, failing instead of overflowing.
fn share_of(amount: Decimal, percentage: u32, what: &str) -> Result<Decimal, HedgeError> {
    amount
        .checked_mul(Decimal::from(percentage))
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| out_of_range(what))
}

/// Portion of a salary routed to USD.
pub fn salary_conversion_amount(salary: Decimal, target_percentage: u32) -> Result<Decimal, HedgeError> {
    share_of(salary, target_percentage, "salary")
}

/// USD received for `local_amount` at `rate` local units per USD, in cents.
pub fn usd_for_local(local_amount: Decimal, rate: Decimal) -> Result<Decimal, HedgeError> {
    if rate <= Decimal::ZERO {
        return Err(HedgeError::InvalidRate(format!("cannot convert at rate {}", rate)));
    }
    local_amount
        .checked_div(rate)
        .map(|usd| usd.round_dp(2))
        .ok_or_else(|| HedgeError::InvalidRate("conversion out of range".to_string()))
}

fn positive_amount(amount: Decimal, what: &str) -> Result<(), HedgeError> {
    if amount <= Decimal::ZERO {
        return Err(HedgeError::InvalidAmount(format!("{} must be positive, got {}", what, amount)));
    }
    Ok(())
}

/// Automatic path: convert the configured share of `salary` when the cooldown
/// has passed and the weekly move is a depreciation at or past the threshold.
pub fn plan_salary_conversion(
    record: &ProtectionRecord,
    salary: Decimal,
    snapshot: &MarketSnapshot,
    now: u64,
    limits: &ProtectionLimits,
) -> Result<Option<ConversionPlan>, HedgeError> {
    positive_amount(salary, "salary")?;

    if !cooldown_elapsed(record.last_conversion, now, limits.cooldown_secs()) {
        debug!(user = %record.user.short(), "conversion cooldown still running");
        return Ok(None);
    }

    let decision = evaluate_snapshot(snapshot, Window::Week, &record.config)?;
    if !decision.recommends_protection() {
        return Ok(None);
    }

    let local_amount = salary_conversion_amount(salary, record.config.target_percentage)?;
    Ok(Some(ConversionPlan {
        usd_amount: usd_for_local(local_amount, snapshot.current)?,
        local_amount,
        exchange_rate: snapshot.current,
        reason: TriggerReason::Automatic,
        decision: Some(decision),
    }))
}

/// Manual path: convert `amount` right away at the current rate.
pub fn plan_manual_conversion(amount: Decimal, snapshot: &MarketSnapshot) -> Result<ConversionPlan, HedgeError> {
    positive_amount(amount, "amount")?;
    Ok(ConversionPlan {
        usd_amount: usd_for_local(amount, snapshot.current)?,
        local_amount: amount,
        exchange_rate: snapshot.current,
        reason: TriggerReason::Manual,
        decision: None,
    })
}

/// Rebalance path: fires when the USD share of total holdings is strictly
/// below `target_percentage`, and converts exactly enough local currency to
/// bring the share back to the target.
pub fn plan_rebalance(
    local_holdings: Decimal,
    usd_holdings: Decimal,
    rate: Decimal,
    target_percentage: u32,
) -> Result<Option<ConversionPlan>, HedgeError> {
    if local_holdings < Decimal::ZERO || usd_holdings < Decimal::ZERO {
        return Err(HedgeError::InvalidAmount("holdings must not be negative".to_string()));
    }
    if rate <= Decimal::ZERO {
        return Err(HedgeError::InvalidRate(format!("cannot rebalance at rate {}", rate)));
    }
    let local_in_usd = local_holdings
        .checked_div(rate)
        .ok_or_else(|| out_of_range("holdings"))?;

    let total_usd = usd_holdings
        .checked_add(local_in_usd)
        .ok_or_else(|| out_of_range("holdings"))?;
    if total_usd.is_zero() {
        return Ok(None);
    }

    let target_usd = share_of(total_usd, target_percentage, "holdings")?;
    if usd_holdings >= target_usd {
        return Ok(None);
    }

    let shortfall_usd = target_usd - usd_holdings;
    let local_amount = shortfall_usd
        .checked_mul(rate)
        .ok_or_else(|| out_of_range("rebalance amount"))?
        .round_dp(2)
        .min(local_holdings);
    if local_amount.is_zero() {
        return Ok(None);
    }

    Ok(Some(ConversionPlan {
        usd_amount: usd_for_local(local_amount, rate)?,
        local_amount,
        exchange_rate: rate,
        reason: TriggerReason::Rebalance,
        decision: None,
    }))
}
