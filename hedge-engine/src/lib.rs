//! Pure decision logic for the hedge dashboard: trigger evaluation, metrics
//! aggregation, setup validation and conversion planning. Nothing in this
//! crate performs I/O.

pub mod error;
pub mod metrics;
pub mod planner;
pub mod trigger;
pub mod validation;

pub use error::{ConfigField, HedgeError};
pub use metrics::{aggregate, devaluation_percent};
pub use planner::{
    cooldown_elapsed, plan_manual_conversion, plan_rebalance, plan_salary_conversion, salary_conversion_amount,
    usd_for_local, ConversionPlan,
};
pub use trigger::{evaluate_snapshot, evaluate_trigger, TriggerDecision};
pub use validation::{validate, validation_issues, ConfigDraft};
