//! Route compliance check against forbidden zones

use std::sync::Arc;

use crate::config::RoutingConfig;
use crate::geometry::{route_intersects_polygon, BBox};
use crate::route::RouteResponse;

/// Outcome of validating a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// The response carried no usable route
    NoRoute,
    /// The route enters or crosses a forbidden zone
    Violation { zone_id: String, reason: String },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn reason(&self) -> &str {
        match self {
            Validation::Valid => "Valid",
            Validation::NoRoute => "No route data",
            Validation::Violation { reason, .. } => reason,
        }
    }
}

/// Checks route geometry against every forbidden zone. Fails closed.
#[derive(Debug, Clone)]
pub struct RouteValidator {
    config: Arc<RoutingConfig>,
}

impl RouteValidator {
    pub fn new(config: Arc<RoutingConfig>) -> Self {
        Self { config }
    }

    pub fn validate(&self, response: &RouteResponse) -> Validation {
        let Some(route) = response.primary() else {
            return Validation::NoRoute;
        };
        let points = route.geometry.points();
        if points.is_empty() {
            return Validation::NoRoute;
        }

        let route_bbox = BBox::of(&points);
        for zone in self.config.forbidden_zones() {
            // A route whose box misses the zone's box cannot touch the zone
            if !route_bbox.intersects(&zone.bbox()) {
                continue;
            }
            if route_intersects_polygon(&points, &zone.geometry) {
                return Validation::Violation {
                    zone_id: zone.id.clone(),
                    reason: format!("Spatial Violation: Intersects {}", zone.display_name()),
                };
            }
        }

        Validation::Valid
    }
}
