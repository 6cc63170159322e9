//! Upstream route documents and request stops
//!
//! The route document is passed through to callers untouched. Only the
//! geometry is interpreted (by the validator); every other field, known or
//! not, survives a deserialize/serialize round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::Point;

/// A stop supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }

    /// Finite and within WGS84 ranges
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// GeoJSON line geometry, coordinates in `[lon, lat]` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGeometry {
    #[serde(rename = "type", default = "line_string")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

fn line_string() -> String {
    "LineString".to_string()
}

impl LineGeometry {
    pub fn points(&self) -> Vec<Point> {
        self.coordinates.iter().copied().map(Point::from_lon_lat).collect()
    }
}

/// One route alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub legs: Vec<Value>,
    pub geometry: LineGeometry,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub waypoints: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RouteResponse {
    /// The route callers display
    pub fn primary(&self) -> Option<&Route> {
        self.routes.first()
    }
}
