//! Geofenced route broker
//!
//! Umbrella crate over the workspace members:
//!
//! - [`core`]: geometry, zone/portal configuration, transformation, validation
//! - [`client`]: upstream routing client with circuit breaker
//! - [`server`]: route broker, result cache and HTTP surface

pub use geofence_client as client;
pub use geofence_core as core;
pub use geofence_server as server;

pub use geofence_core::{RouteResponse, RoutingConfig, Stop, Strategy};
pub use geofence_server::{BrokerError, BrokerSettings, RouteBroker};
