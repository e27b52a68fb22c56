use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hedge_engine::{ConfigField, HedgeError};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Hedge(HedgeError),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<ConfigField>,
    retryable: bool,
}

impl From<HedgeError> for ApiError {
    fn from(e: HedgeError) -> Self {
        ApiError::Hedge(e)
    }
}

pub fn status_of(e: &HedgeError) -> StatusCode {
    match e {
        HedgeError::InvalidConfiguration { .. } | HedgeError::InvalidRate(_) | HedgeError::InvalidAmount(_) => {
            StatusCode::BAD_REQUEST
        }
        HedgeError::UserNotFound(_) => StatusCode::NOT_FOUND,
        HedgeError::SubmissionInFlight | HedgeError::InvalidTransition { .. } => StatusCode::CONFLICT,
        HedgeError::GatewayUnavailable(_) | HedgeError::SimulationError(_) | HedgeError::SubmissionError(_) => {
            StatusCode::BAD_GATEWAY
        }
        HedgeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Stable name for the variant, so clients can rebuild the error.
pub fn kind_of(e: &HedgeError) -> &'static str {
    match e {
        HedgeError::InvalidConfiguration { .. } => "invalid_configuration",
        HedgeError::InvalidRate(_) => "invalid_rate",
        HedgeError::InvalidAmount(_) => "invalid_amount",
        HedgeError::GatewayUnavailable(_) => "gateway_unavailable",
        HedgeError::SimulationError(_) => "simulation_error",
        HedgeError::SubmissionError(_) => "submission_error",
        HedgeError::UserNotFound(_) => "user_not_found",
        HedgeError::SubmissionInFlight => "submission_in_flight",
        HedgeError::InvalidTransition { .. } => "invalid_transition",
        HedgeError::Cancelled => "cancelled",
    }
}

/// The variant's payload without the display prefix.
pub fn detail_of(e: &HedgeError) -> Option<String> {
    match e {
        HedgeError::InvalidConfiguration { reason, .. } => Some(reason.clone()),
        HedgeError::InvalidRate(s)
        | HedgeError::InvalidAmount(s)
        | HedgeError::GatewayUnavailable(s)
        | HedgeError::SimulationError(s)
        | HedgeError::SubmissionError(s)
        | HedgeError::UserNotFound(s) => Some(s.clone()),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Hedge(e) => (
                status_of(&e),
                ErrorBody {
                    error: e.to_string(),
                    kind: kind_of(&e),
                    detail: detail_of(&e),
                    field: e.field(),
                    retryable: e.is_retryable(),
                },
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: msg, kind: "bad_request", detail: None, field: None, retryable: false },
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { error: msg, kind: "internal", detail: None, field: None, retryable: true },
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(status_of(&HedgeError::SubmissionInFlight), StatusCode::CONFLICT);
        assert_eq!(status_of(&HedgeError::UserNotFound("G".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&HedgeError::SimulationError("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(&HedgeError::invalid(ConfigField::Percentage, "too high")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn detail_drops_display_prefix() {
        let e = HedgeError::InvalidAmount("salary must be positive".into());
        assert_eq!(kind_of(&e), "invalid_amount");
        assert_eq!(detail_of(&e).as_deref(), Some("salary must be positive"));
        assert_eq!(detail_of(&HedgeError::Cancelled), None);
    }
}
