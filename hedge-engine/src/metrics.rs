use crate::error::HedgeError;
use crate::trigger::percentage_change;
use hedge_types::{ConversionEvent, ProtectionMetrics};
use rust_decimal::Decimal;

/// Fold a conversion history into dashboard metrics.
///
/// `baseline` and `baseline_count` cover conversions that have aged out of
/// the retained history, so totals and the average span every conversion.
/// `devaluation` is passed through untouched; it comes from the market data
/// provider, not from the events.
pub fn aggregate(
    events: &[ConversionEvent],
    baseline: Decimal,
    baseline_count: u32,
    devaluation: Decimal,
) -> ProtectionMetrics {
    let total_protected = events
        .iter()
        .fold(baseline, |acc, event| acc.saturating_add(event.usd_amount));
    let conversion_count = u32::try_from(events.len())
        .unwrap_or(u32::MAX)
        .saturating_add(baseline_count);

    let average_protection = if conversion_count == 0 {
        Decimal::ZERO
    } else {
        total_protected
            .checked_div(Decimal::from(conversion_count))
            .unwrap_or(Decimal::ZERO)
    };

    ProtectionMetrics {
        total_protected,
        currency_devaluation: devaluation,
        conversion_count,
        average_protection,
    }
}

/// Signed devaluation over a window, in percent (positive when the local
/// currency lost value against USD).
pub fn devaluation_percent(current: Decimal, reference: Decimal) -> Result<Decimal, HedgeError> {
    percentage_change(current, reference)
}
