use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Setup form field a validation failure refers to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigField {
    Currency,
    Percentage,
    Threshold,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigField::Currency => f.write_str("currency"),
            ConfigField::Percentage => f.write_str("percentage"),
            ConfigField::Threshold => f.write_str("threshold"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HedgeError {
    #[error("invalid {field}: {reason}")]
    InvalidConfiguration { field: ConfigField, reason: String },

    #[error("invalid rate: {0}")]
    InvalidRate(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("simulation failed: {0}")]
    SimulationError(String),

    #[error("submission failed: {0}")]
    SubmissionError(String),

    #[error("no protection configured for {0}")]
    UserNotFound(String),

    #[error("a setup submission is already pending")]
    SubmissionInFlight,

    #[error("cannot {action} while {from}")]
    InvalidTransition { from: &'static str, action: &'static str },

    #[error("operation cancelled")]
    Cancelled,
}

impl HedgeError {
    pub fn invalid(field: ConfigField, reason: impl Into<String>) -> Self {
        HedgeError::InvalidConfiguration { field, reason: reason.into() }
    }

    /// External failures the UI offers a retry for.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HedgeError::GatewayUnavailable(_)
                | HedgeError::SimulationError(_)
                | HedgeError::SubmissionError(_)
                | HedgeError::Cancelled
        )
    }

    pub fn field(&self) -> Option<ConfigField> {
        match self {
            HedgeError::InvalidConfiguration { field, .. } => Some(*field),
            _ => None,
        }
    }
}
