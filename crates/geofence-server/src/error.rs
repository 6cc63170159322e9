//! Broker error types

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use geofence_client::ClientError;
use serde::Serialize;
use thiserror::Error;

/// Structured error response for API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Why the most recent strategy attempt failed
#[derive(Debug, Clone, PartialEq)]
pub enum LastFailure {
    /// No strategy was attempted
    None,
    /// Transport error, timeout, 4xx/5xx or unparseable body
    Upstream { status: Option<u16>, message: String },
    CircuitOpen(String),
    /// The provider's route violated a zone or carried no route
    Spatial {
        zone_id: Option<String>,
        reason: String,
    },
    /// A rejection remembered by the negative cache
    CachedRejection(String),
}

impl From<&ClientError> for LastFailure {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::CircuitOpen { .. } => LastFailure::CircuitOpen(err.to_string()),
            ClientError::Upstream { status, .. } => LastFailure::Upstream {
                status: Some(*status),
                message: err.to_string(),
            },
            _ => LastFailure::Upstream {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

impl fmt::Display for LastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastFailure::None => f.write_str("Unknown Error"),
            LastFailure::Upstream { message, .. } => f.write_str(message),
            LastFailure::CircuitOpen(message) => f.write_str(message),
            LastFailure::Spatial { reason, .. } => f.write_str(reason),
            LastFailure::CachedRejection(reason) => write!(f, "{} (cached)", reason),
        }
    }
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(
        "Configuration error: stop '{stop}' is inside restricted zone '{zone}' but has no portal rule. Configure a portal for this stop."
    )]
    Config { stop: String, zone: String },

    #[error("Routing timeout: exceeded {:.1}s budget after {attempts} attempt(s). Last error: {last}", .budget.as_secs_f64())]
    BudgetExceeded {
        budget: Duration,
        attempts: usize,
        last: LastFailure,
    },

    #[error("All strategies failed. Last error: {last}")]
    Exhausted { attempts: usize, last: LastFailure },
}

impl BrokerError {
    /// The failure that decided the outcome, if any strategy ran
    pub fn last_failure(&self) -> Option<&LastFailure> {
        match self {
            BrokerError::BudgetExceeded { last, .. } | BrokerError::Exhausted { last, .. } => {
                Some(last)
            }
            _ => None,
        }
    }

    /// Get the error code for structured responses
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::InvalidRequest(_) => "INVALID_REQUEST",
            BrokerError::Config { .. } => "CONFIG_ERROR",
            BrokerError::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            BrokerError::Exhausted { last, .. } => match last {
                LastFailure::CircuitOpen(_) => "CIRCUIT_OPEN",
                LastFailure::Spatial { .. } | LastFailure::CachedRejection(_) => {
                    "SPATIAL_VIOLATION"
                }
                LastFailure::Upstream { .. } => "UPSTREAM_ERROR",
                LastFailure::None => "ROUTING_FAILED",
            },
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            BrokerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BrokerError::Config { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BrokerError::BudgetExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            BrokerError::Exhausted { last, .. } => match last {
                LastFailure::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
                LastFailure::Spatial { .. } | LastFailure::CachedRejection(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LastFailure::Upstream { .. } | LastFailure::None => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
