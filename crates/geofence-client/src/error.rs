//! Client error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or timeout; counts against the circuit
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the provider. Only 5xx counts against the circuit.
    #[error("Upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("Circuit open: upstream unavailable (retry in {:.1}s)", .retry_in.as_secs_f64())]
    CircuitOpen { retry_in: Duration },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No concurrency slot freed up within the call's timeout. The upstream
    /// was never contacted, so the circuit is unaffected.
    #[error("Timed out after {:.1}s waiting for an upstream slot", .waited.as_secs_f64())]
    QueueTimeout { waited: Duration },

    /// `Semaphore::acquire` reports this, although the client never closes
    /// its own gate
    #[error("Client closed")]
    Closed,
}

impl ClientError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ClientError::CircuitOpen { .. })
    }

    /// Whether the provider rejected the request itself (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClientError::Upstream { status, .. } if (400..500).contains(status))
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout(),
            ClientError::QueueTimeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
