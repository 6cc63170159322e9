//! geofence-client: failure-isolating client for the upstream routing provider
//!
//! Requests go through a shared circuit breaker and a bounded concurrency
//! gate so a struggling provider is neither hammered by bursts nor waited on
//! while it is known to be down.

pub mod breaker;
pub mod client;
pub mod error;

pub use breaker::{CallPermit, CircuitBreaker, CircuitSnapshot, CircuitState};
pub use client::{ClientBuilder, ClientConfig, UpstreamRouteClient};
pub use error::ClientError;
