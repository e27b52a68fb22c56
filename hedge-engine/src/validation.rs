use crate::error::{ConfigField, HedgeError};
use hedge_types::{CurrencyCode, ProtectionLimits, UserConfiguration};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Setup form contents before validation. Any field may still be missing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ConfigDraft {
    pub currency: Option<CurrencyCode>,
    pub percentage: Option<u32>,
    pub threshold: Option<Decimal>,
}

impl ConfigDraft {
    /// Empty currency with the default slider positions.
    pub fn with_defaults(limits: &ProtectionLimits) -> Self {
        Self {
            currency: None,
            percentage: Some(limits.default_percentage),
            threshold: Some(limits.default_threshold),
        }
    }

    pub fn from_config(config: &UserConfiguration) -> Self {
        Self {
            currency: Some(config.currency.clone()),
            percentage: Some(config.target_percentage),
            threshold: Some(config.threshold),
        }
    }
}

/// Every problem with `draft`, in form order. Empty when the draft is complete.
pub fn validation_issues(
    draft: &ConfigDraft,
    supported: &BTreeSet<CurrencyCode>,
    limits: &ProtectionLimits,
) -> Vec<HedgeError> {
    let mut issues = Vec::new();

    match &draft.currency {
        None => issues.push(HedgeError::invalid(ConfigField::Currency, "select a currency")),
        Some(code) if code.is_empty() => {
            issues.push(HedgeError::invalid(ConfigField::Currency, "select a currency"))
        }
        Some(code) if !supported.contains(code) => issues.push(HedgeError::invalid(
            ConfigField::Currency,
            format!("{} is not supported", code),
        )),
        Some(_) => {}
    }

    match draft.percentage {
        None => issues.push(HedgeError::invalid(ConfigField::Percentage, "choose a percentage")),
        Some(p) if p < limits.min_percentage || p > limits.max_percentage => {
            issues.push(HedgeError::invalid(
                ConfigField::Percentage,
                format!(
                    "{}% is outside {}%..={}%",
                    p, limits.min_percentage, limits.max_percentage
                ),
            ))
        }
        Some(_) => {}
    }

    match draft.threshold {
        None => issues.push(HedgeError::invalid(ConfigField::Threshold, "choose a threshold")),
        Some(t) if t < limits.min_threshold || t > limits.max_threshold => {
            issues.push(HedgeError::invalid(
                ConfigField::Threshold,
                format!(
                    "{}% is outside {}%..={}%",
                    t, limits.min_threshold, limits.max_threshold
                ),
            ))
        }
        Some(_) => {}
    }

    issues
}

/// Gate for setup submission. Fails on the first invalid field.
pub fn validate(
    draft: &ConfigDraft,
    supported: &BTreeSet<CurrencyCode>,
    limits: &ProtectionLimits,
) -> Result<UserConfiguration, HedgeError> {
    if let Some(issue) = validation_issues(draft, supported, limits).into_iter().next() {
        return Err(issue);
    }

    match (&draft.currency, draft.percentage, draft.threshold) {
        (Some(currency), Some(target_percentage), Some(threshold)) => Ok(UserConfiguration {
            currency: currency.clone(),
            target_percentage,
            threshold,
        }),
        // validation_issues reports every missing field
        _ => Err(HedgeError::invalid(ConfigField::Currency, "incomplete configuration")),
    }
}
