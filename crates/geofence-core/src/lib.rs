//! geofence-core: spatial rules for geofenced road routing
//!
//! Everything here is pure and synchronous:
//!
//! - [`geometry`]: point-in-polygon, segment intersection, bounding boxes
//! - [`config`]: forbidden zones and stop portals, versioned by a content hash
//! - [`transform`]: stop list to provider coordinates (portal substitution,
//!   strategy via anchors)
//! - [`validator`]: route geometry against forbidden zones
//!
//! Network access, caching and orchestration live in `geofence-client` and
//! `geofence-server`.

pub mod config;
mod error;
pub mod geometry;
mod route;
mod strategy;
pub mod transform;
pub mod validator;

pub use config::{NamedPortal, Portal, PortalKind, RoutingConfig, Zone, ZoneRule};
pub use error::Error;
pub use geometry::{
    point_in_polygon, route_intersects_polygon, segments_intersect, BBox, Point,
};
pub use route::{LineGeometry, Route, RouteResponse, Stop};
pub use strategy::{Strategy, ViaAnchors};
pub use transform::CoordinateTransformer;
pub use validator::{RouteValidator, Validation};

pub type Result<T> = std::result::Result<T, Error>;

/// Operational defaults shared by the client and the broker
pub mod constants {
    use std::time::Duration;

    /// Id of the zone whose surroundings enable the biased strategies
    pub const SENSITIVE_ZONE_ID: &str = "ZONE_BEACH_RD";

    /// Wall-clock budget for one broker request
    pub const TIME_BUDGET: Duration = Duration::from_secs(8);

    /// Timeout for a single upstream call
    pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(4);

    /// Consecutive upstream failures that open the circuit
    pub const FAILURE_THRESHOLD: u32 = 3;

    /// Time an open circuit waits before admitting a trial call
    pub const CIRCUIT_COOLDOWN: Duration = Duration::from_secs(30);

    /// Concurrent in-flight upstream calls
    pub const MAX_CONCURRENCY: usize = 20;

    /// Cached routes kept at most
    pub const CACHE_CAPACITY: usize = 200;

    /// Lifetime of a validated route in the cache
    pub const POSITIVE_TTL: Duration = Duration::from_secs(300);

    /// Lifetime of a rejected strategy in the cache
    pub const NEGATIVE_TTL: Duration = Duration::from_secs(30);
}
