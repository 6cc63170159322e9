//! Zone and portal configuration
//!
//! Two documents are loaded once at startup and never change afterwards:
//!
//! - zones: `{"zones": [{"id", "name", "rule", "geometry": [[lat, lon], ...]}]}`
//! - portals: `{"portals": {"<name token>": {"type", "entry_gate", "exit_gate"}}}`
//!
//! The bare forms (a top-level array of zones, a top-level map of portals)
//! are accepted as well.
//!
//! A content hash over both documents versions the configuration so that
//! cached routes computed against an older configuration are never served.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, Point};
use crate::Result;

/// How a zone constrains routes
///
/// Rules other than `FORBIDDEN_SEGMENT` are kept verbatim and not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ZoneRule {
    /// No part of a route may enter or cross the polygon
    ForbiddenSegment,
    Other(String),
}

impl ZoneRule {
    pub fn as_str(&self) -> &str {
        match self {
            ZoneRule::ForbiddenSegment => "FORBIDDEN_SEGMENT",
            ZoneRule::Other(rule) => rule,
        }
    }
}

impl From<String> for ZoneRule {
    fn from(rule: String) -> Self {
        if rule == "FORBIDDEN_SEGMENT" {
            ZoneRule::ForbiddenSegment
        } else {
            ZoneRule::Other(rule)
        }
    }
}

impl From<ZoneRule> for String {
    fn from(rule: ZoneRule) -> Self {
        match rule {
            ZoneRule::ForbiddenSegment => "FORBIDDEN_SEGMENT".to_string(),
            ZoneRule::Other(rule) => rule,
        }
    }
}

/// A restricted area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub rule: ZoneRule,
    /// Closed polygon, stored as `[lat, lon]` pairs on disk
    #[serde(with = "lat_lon_pairs")]
    pub geometry: Vec<Point>,
}

impl Zone {
    pub fn is_forbidden(&self) -> bool {
        self.rule == ZoneRule::ForbiddenSegment
    }

    pub fn bbox(&self) -> BBox {
        BBox::of(&self.geometry)
    }

    /// Name for messages, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// How a stop behind a portal is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortalKind {
    /// Stop behind an access-controlled gate (airport, gated campus)
    AccessControlledStop,
    /// Ordinary stop with distinct ways in and out. Unrecognised types
    /// fall back to this.
    #[default]
    #[serde(other)]
    Standard,
}

/// Gate coordinates substituted for a stop's physical location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    #[serde(rename = "type", default)]
    pub kind: PortalKind,
    pub entry_gate: Point,
    pub exit_gate: Point,
}

/// A portal together with the name token that selects it
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPortal {
    pub key: String,
    key_lower: String,
    pub portal: Portal,
}

impl NamedPortal {
    fn new(key: String, portal: Portal) -> Self {
        let key_lower = key.to_lowercase();
        Self {
            key,
            key_lower,
            portal,
        }
    }

    /// Case-insensitive substring match against a stop name
    pub fn matches(&self, stop_name: &str) -> bool {
        stop_name.to_lowercase().contains(&self.key_lower)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ZonesDocument {
    Wrapped { zones: Vec<Zone> },
    Bare(Vec<Zone>),
}

impl ZonesDocument {
    fn into_zones(self) -> Vec<Zone> {
        match self {
            ZonesDocument::Wrapped { zones } | ZonesDocument::Bare(zones) => zones,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortalsDocument {
    Wrapped { portals: BTreeMap<String, Portal> },
    Bare(BTreeMap<String, Portal>),
}

impl PortalsDocument {
    fn into_portals(self) -> BTreeMap<String, Portal> {
        match self {
            PortalsDocument::Wrapped { portals } | PortalsDocument::Bare(portals) => portals,
        }
    }
}

#[derive(Serialize)]
struct CanonicalZones<'a> {
    zones: &'a [Zone],
}

#[derive(Serialize)]
struct CanonicalPortals<'a> {
    portals: &'a BTreeMap<String, Portal>,
}

/// Immutable, versioned routing configuration
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    zones: Vec<Zone>,
    /// Longest key first, then alphabetical (case-insensitive)
    portals: Vec<NamedPortal>,
    config_hash: String,
}

impl RoutingConfig {
    /// Build a configuration from parsed documents.
    ///
    /// Empty portal keys are dropped. Overlapping portal keys and degenerate
    /// zone polygons are logged as warnings.
    pub fn new(zones: Vec<Zone>, mut portals: BTreeMap<String, Portal>) -> Self {
        portals.retain(|key, _| {
            let keep = !key.trim().is_empty();
            if !keep {
                tracing::warn!("Dropping portal with empty name token");
            }
            keep
        });

        let config_hash = compute_hash(&zones, &portals);

        let mut ordered: Vec<NamedPortal> = portals
            .into_iter()
            .map(|(key, portal)| NamedPortal::new(key, portal))
            .collect();
        ordered.sort_by(|a, b| {
            b.key_lower
                .len()
                .cmp(&a.key_lower.len())
                .then_with(|| a.key_lower.cmp(&b.key_lower))
                .then_with(|| a.key.cmp(&b.key))
        });

        let config = Self {
            zones,
            portals: ordered,
            config_hash,
        };
        config.log_warnings();
        config
    }

    /// Configuration with no zones and no portals: geofencing disabled
    pub fn empty() -> Self {
        Self::new(Vec::new(), BTreeMap::new())
    }

    /// Strict construction from in-memory JSON documents
    pub fn from_json(zones_json: &str, portals_json: &str) -> Result<Self> {
        let zones: ZonesDocument = serde_json::from_str(zones_json)?;
        let portals: PortalsDocument = serde_json::from_str(portals_json)?;
        Ok(Self::new(zones.into_zones(), portals.into_portals()))
    }

    /// Load both documents from disk.
    ///
    /// Never fails: a document that is missing or unreadable is replaced by
    /// an empty one so the process still starts with geofencing disabled.
    pub fn load(zones_path: impl AsRef<Path>, portals_path: impl AsRef<Path>) -> Self {
        let zones = read_document::<ZonesDocument>(zones_path.as_ref())
            .map(ZonesDocument::into_zones)
            .unwrap_or_default();
        let portals = read_document::<PortalsDocument>(portals_path.as_ref())
            .map(PortalsDocument::into_portals)
            .unwrap_or_default();

        let config = Self::new(zones, portals);
        tracing::info!(
            zones = config.zones.len(),
            portals = config.portals.len(),
            hash = %config.config_hash,
            "Loaded routing configuration"
        );
        config
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn forbidden_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.is_forbidden())
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Portals in match order
    pub fn portals(&self) -> &[NamedPortal] {
        &self.portals
    }

    /// First portal (in match order) whose key occurs in `stop_name`
    pub fn find_portal(&self, stop_name: &str) -> Option<&NamedPortal> {
        let name = stop_name.to_lowercase();
        self.portals.iter().find(|p| name.contains(&p.key_lower))
    }

    /// Hex digest identifying this configuration version
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Pairs `(winner, shadowed)` where `shadowed` is a substring of `winner`.
    ///
    /// Any stop name matching `winner` also matches `shadowed`; the longer key
    /// takes precedence.
    pub fn overlapping_portal_keys(&self) -> Vec<(&str, &str)> {
        let mut overlaps = Vec::new();
        for (i, longer) in self.portals.iter().enumerate() {
            for shorter in &self.portals[i + 1..] {
                if longer.key_lower.contains(&shorter.key_lower) {
                    overlaps.push((longer.key.as_str(), shorter.key.as_str()));
                }
            }
        }
        overlaps
    }

    fn log_warnings(&self) {
        for (winner, shadowed) in self.overlapping_portal_keys() {
            tracing::warn!(
                winner,
                shadowed,
                "Overlapping portal keys, the longer key takes precedence"
            );
        }
        for zone in &self.zones {
            if zone.geometry.len() < 3 {
                tracing::warn!(
                    zone = %zone.id,
                    vertices = zone.geometry.len(),
                    "Zone polygon has fewer than 3 vertices"
                );
            }
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self::empty()
    }
}

fn compute_hash(zones: &[Zone], portals: &BTreeMap<String, Portal>) -> String {
    let mut hasher = blake3::Hasher::new();
    // Serializing our own types cannot fail; fall back to an empty body anyway.
    let zones_json = serde_json::to_vec(&CanonicalZones { zones }).unwrap_or_default();
    let portals_json = serde_json::to_vec(&CanonicalPortals { portals }).unwrap_or_default();
    hasher.update(&zones_json);
    hasher.update(&portals_json);
    hasher.finalize().to_hex().to_string()
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config missing, using empty document");
        return None;
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(crate::Error::from)
        .and_then(|data| serde_json::from_str(&data).map_err(crate::Error::from));

    match parsed {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Config load error, using empty document"
            );
            None
        }
    }
}

/// `Vec<Point>` as a sequence of `[lat, lon]` pairs
mod lat_lon_pairs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::geometry::Point;

    pub fn serialize<S: Serializer>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<[f64; 2]> = points.iter().map(|p| [p.lat, p.lon]).collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point>, D::Error> {
        let pairs = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(Point::from).collect())
    }
}
