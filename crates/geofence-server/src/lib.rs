//! geofence-server: zone-aware route broker
//!
//! Accepts stop lists over HTTP, asks an OSRM-compatible provider for a
//! route under a sequence of strategies and returns the first one that
//! avoids every forbidden zone.

pub mod broker;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use broker::{cache_key, BrokerSettings, RouteBroker};
pub use cache::{CachedOutcome, ResultCache};
pub use error::{BrokerError, ErrorResponse, LastFailure};
pub use crate::metrics::init_prometheus_recorder;
pub use routes::{create_router, create_router_with_metrics, HealthResponse, RouteRequest};
pub use server::{build_broker, build_state, ServerConfig};
pub use state::{create_shared_state, ServerState, SharedState};
