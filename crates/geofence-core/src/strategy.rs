//! Coordinate-construction strategies and their via anchors

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// How the provider request is built for a stop sequence.
///
/// Every strategy applies portal substitution; the `Plus*` variants also
/// insert a single via anchor to bias the provider towards a corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    PortalsOnly,
    PortalsPlusCity,
    PortalsPlusHighway,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::PortalsOnly => "PORTALS_ONLY",
            Strategy::PortalsPlusCity => "PORTALS_PLUS_CITY",
            Strategy::PortalsPlusHighway => "PORTALS_PLUS_HIGHWAY",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed via points used by the biased strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViaAnchors {
    /// City-centre anchor (Palayam)
    pub city: Point,
    /// Bypass-road anchor
    pub highway: Point,
}

impl ViaAnchors {
    /// The anchor a strategy inserts, if any
    pub fn for_strategy(&self, strategy: Strategy) -> Option<Point> {
        match strategy {
            Strategy::PortalsOnly => None,
            Strategy::PortalsPlusCity => Some(self.city),
            Strategy::PortalsPlusHighway => Some(self.highway),
        }
    }
}

impl Default for ViaAnchors {
    fn default() -> Self {
        Self {
            city: Point::new(11.252, 75.788),
            highway: Point::new(11.270, 75.820),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for s in [
            Strategy::PortalsOnly,
            Strategy::PortalsPlusCity,
            Strategy::PortalsPlusHighway,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s));
        }
    }

    #[test]
    fn test_anchor_selection() {
        let anchors = ViaAnchors::default();
        assert_eq!(anchors.for_strategy(Strategy::PortalsOnly), None);
        assert_eq!(
            anchors.for_strategy(Strategy::PortalsPlusCity),
            Some(anchors.city)
        );
        assert_eq!(
            anchors.for_strategy(Strategy::PortalsPlusHighway),
            Some(anchors.highway)
        );
    }
}
