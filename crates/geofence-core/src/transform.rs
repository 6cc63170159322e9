//! Stop list to provider coordinates
//!
//! | Position     | No portal | Standard portal             | Access-controlled portal |
//! |--------------|-----------|-----------------------------|--------------------------|
//! | Origin       | stop      | exit gate                   | exit gate                |
//! | Destination  | stop      | entry gate                  | entry gate               |
//! | Intermediate | stop      | entry gate, stop, exit gate | entry gate               |
//!
//! An intermediate access-controlled stop is approximated by its access
//! road: the route passes the gate once instead of detouring through the
//! gated interior.

use std::sync::Arc;

use crate::config::{PortalKind, RoutingConfig};
use crate::geometry::Point;
use crate::route::Stop;
use crate::strategy::{Strategy, ViaAnchors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Origin,
    Destination,
    Intermediate,
}

/// Rewrites stops into routing-provider-safe coordinates
#[derive(Debug, Clone)]
pub struct CoordinateTransformer {
    config: Arc<RoutingConfig>,
    anchors: ViaAnchors,
}

impl CoordinateTransformer {
    pub fn new(config: Arc<RoutingConfig>, anchors: ViaAnchors) -> Self {
        Self { config, anchors }
    }

    pub fn anchors(&self) -> &ViaAnchors {
        &self.anchors
    }

    /// Provider coordinates for `stops` (already in travel order) under `strategy`
    pub fn transform(&self, stops: &[Stop], strategy: Strategy) -> Vec<Point> {
        let mut coords = Vec::with_capacity(stops.len() + 3);
        let last = stops.len().saturating_sub(1);

        for (i, stop) in stops.iter().enumerate() {
            let position = if i == 0 {
                Position::Origin
            } else if i == last {
                Position::Destination
            } else {
                Position::Intermediate
            };

            let Some(named) = self.config.find_portal(&stop.name) else {
                coords.push(stop.point());
                continue;
            };
            let portal = &named.portal;

            match (position, portal.kind) {
                (Position::Origin, _) => coords.push(portal.exit_gate),
                (Position::Destination, _) => coords.push(portal.entry_gate),
                (Position::Intermediate, PortalKind::AccessControlledStop) => {
                    tracing::debug!(
                        stop = %stop.name,
                        portal = %named.key,
                        "Intermediate stop routed via gate"
                    );
                    coords.push(portal.entry_gate);
                }
                (Position::Intermediate, PortalKind::Standard) => {
                    coords.push(portal.entry_gate);
                    coords.push(stop.point());
                    coords.push(portal.exit_gate);
                }
            }
        }

        if let Some(anchor) = self.anchors.for_strategy(strategy) {
            let mid = (coords.len() / 2).max(1).min(coords.len());
            coords.insert(mid, anchor);
            tracing::debug!(%strategy, index = mid, "Inserted via anchor");
        }

        tracing::debug!(
            stops = stops.len(),
            coords = coords.len(),
            %strategy,
            "Transformed stop coordinates"
        );
        coords
    }
}
