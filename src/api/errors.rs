//! API error responses
//!
//! The HTTP layer maps core errors to a status code plus a structured body
//! carrying the stable reason code, so automation can match on `error.code`
//! without parsing messages.

use crate::errors::{OracleError, RaffleError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable reason code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub request_id: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: String, request_id: String) -> Self {
        Self {
            status,
            code: code.to_string(),
            message,
            details: None,
            request_id,
        }
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message, request_id)
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message, request_id)
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            message,
            request_id,
        )
    }

    pub fn service_unavailable(request_id: String, message: String) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
            request_id,
        )
    }

    /// Map a core raffle error onto the HTTP surface.
    pub fn from_raffle(request_id: String, err: RaffleError) -> Self {
        let status = match &err {
            RaffleError::NotEnoughFee { .. } => StatusCode::BAD_REQUEST,
            RaffleError::NotOpen | RaffleError::UpkeepNotNeeded { .. } => StatusCode::CONFLICT,
            RaffleError::UnknownRequest(_) | RaffleError::IndexOutOfRange { .. } => {
                StatusCode::NOT_FOUND
            }
            RaffleError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
            RaffleError::Oracle(OracleError::NonexistentRequest(_)) => StatusCode::NOT_FOUND,
            RaffleError::Oracle(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = match &err {
            RaffleError::UpkeepNotNeeded {
                balance,
                players,
                state,
            } => Some(serde_json::json!({
                "balance": balance,
                "player_count": players,
                "state": state,
            })),
            _ => None,
        };

        Self {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
            details,
            request_id,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raffle_errors_keep_their_reason_codes() {
        let err = ApiError::from_raffle("req-1".to_string(), RaffleError::NotOpen);
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "NotOpen");

        let err = ApiError::from_raffle(
            "req-2".to_string(),
            RaffleError::Oracle(OracleError::NonexistentRequest(9)),
        );
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "nonexistent request");
    }

    #[test]
    fn upkeep_not_needed_exposes_diagnostics() {
        let err = ApiError::from_raffle(
            "req-3".to_string(),
            RaffleError::UpkeepNotNeeded {
                balance: 5,
                players: 1,
                state: crate::raffle::RaffleState::Calculating,
            },
        );
        assert_eq!(err.status, StatusCode::CONFLICT);
        let details = err.details.unwrap();
        assert_eq!(details["balance"], 5);
        assert_eq!(details["player_count"], 1);
        assert_eq!(details["state"], "calculating");
    }
}
