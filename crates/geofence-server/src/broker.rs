//! Route broker: strategies, cache, upstream and validation
//!
//! ```text
//! request -> normalize -> zone-access precheck -> strategy selection
//!         -> for each strategy (while within budget):
//!              cache lookup -> transform -> upstream -> validate -> cache store
//!         -> route | exhaustion error
//! ```
//!
//! The time budget is cooperative: it is checked before each strategy, so a
//! slow upstream call can overshoot it by up to one per-call timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use geofence_client::UpstreamRouteClient;
use geofence_core::constants;
use geofence_core::{
    point_in_polygon, BBox, CoordinateTransformer, Point, RouteResponse, RouteValidator,
    RoutingConfig, Stop, Strategy, Validation, ViaAnchors,
};

use crate::cache::{CachedOutcome, ResultCache};
use crate::error::{BrokerError, LastFailure, Result};

/// Broker tuning
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Wall-clock budget for one request, checked between strategies
    pub time_budget: Duration,
    /// Timeout for each upstream call
    pub upstream_timeout: Duration,
    pub positive_ttl: Duration,
    pub negative_ttl: Duration,
    /// Zone whose neighbourhood enables the biased strategies
    pub sensitive_zone_id: Option<String>,
    pub anchors: ViaAnchors,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            time_budget: constants::TIME_BUDGET,
            upstream_timeout: constants::UPSTREAM_TIMEOUT,
            positive_ttl: constants::POSITIVE_TTL,
            negative_ttl: constants::NEGATIVE_TTL,
            sensitive_zone_id: Some(constants::SENSITIVE_ZONE_ID.to_string()),
            anchors: ViaAnchors::default(),
        }
    }
}

/// Cache key for one strategy attempt on a normalized stop list
pub fn cache_key(stops: &[Stop], strategy: Strategy, config_hash: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    // Stops were validated as finite, so serialization cannot fail
    hasher.update(&serde_json::to_vec(stops).unwrap_or_default());
    hasher.update(b"|");
    hasher.update(strategy.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(config_hash.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub struct RouteBroker {
    config: Arc<RoutingConfig>,
    client: Arc<UpstreamRouteClient>,
    cache: Arc<ResultCache>,
    transformer: CoordinateTransformer,
    validator: RouteValidator,
    settings: BrokerSettings,
}

impl RouteBroker {
    pub fn new(
        config: Arc<RoutingConfig>,
        client: Arc<UpstreamRouteClient>,
        cache: Arc<ResultCache>,
        settings: BrokerSettings,
    ) -> Self {
        let transformer = CoordinateTransformer::new(config.clone(), settings.anchors);
        let validator = RouteValidator::new(config.clone());
        Self {
            config,
            client,
            cache,
            transformer,
            validator,
            settings,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn client(&self) -> &UpstreamRouteClient {
        &self.client
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Compute a compliant route through `stops`
    pub async fn get_route(&self, stops: Vec<Stop>) -> Result<Arc<RouteResponse>> {
        let result = self.route(stops).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.code(),
        };
        metrics::counter!("geofence_route_requests_total", "outcome" => outcome).increment(1);
        result
    }

    async fn route(&self, stops: Vec<Stop>) -> Result<Arc<RouteResponse>> {
        validate_request(&stops)?;
        let stops = normalize(stops);
        tracing::info!(
            stops = ?stops.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Routing request, stops sorted north to south"
        );

        self.check_zone_access(&stops)?;
        let strategies = self.select_strategies(&stops);

        let config_hash = self.config.config_hash();
        let budget = self.settings.time_budget;
        let started = Instant::now();
        let mut last = LastFailure::None;
        let mut attempts = 0;

        for strategy in strategies {
            if started.elapsed() >= budget {
                tracing::warn!(attempts, %last, "Routing time budget exhausted");
                return Err(BrokerError::BudgetExceeded {
                    budget,
                    attempts,
                    last,
                });
            }

            let key = cache_key(&stops, strategy, config_hash);
            match self.cache.get(&key, config_hash) {
                Some(CachedOutcome::Route(route)) => {
                    record_cache_lookup("positive_hit");
                    tracing::debug!(%strategy, "Serving cached route");
                    return Ok(route);
                }
                Some(CachedOutcome::Rejected(reason)) => {
                    record_cache_lookup("negative_hit");
                    tracing::debug!(%strategy, %reason, "Strategy rejected recently, skipping");
                    last = LastFailure::CachedRejection(reason);
                    continue;
                }
                None => record_cache_lookup("miss"),
            }

            attempts += 1;
            let coords = self.transformer.transform(&stops, strategy);
            let response = match self
                .client
                .get_route(&coords, self.settings.upstream_timeout)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    // Transient, so not cached
                    tracing::warn!(%strategy, error = %e, "Strategy failed upstream");
                    record_attempt(strategy, "upstream_error");
                    last = LastFailure::from(&e);
                    continue;
                }
            };

            match self.validator.validate(&response) {
                Validation::Valid => {
                    record_attempt(strategy, "valid");
                    log_route(strategy, &response);
                    let route = Arc::new(response);
                    self.cache.insert(
                        key,
                        CachedOutcome::Route(route.clone()),
                        config_hash,
                        self.settings.positive_ttl,
                    );
                    return Ok(route);
                }
                rejected => {
                    record_attempt(strategy, "rejected");
                    let reason = rejected.reason().to_string();
                    tracing::warn!(%strategy, %reason, "Strategy rejected");
                    self.cache.insert(
                        key,
                        CachedOutcome::Rejected(reason.clone()),
                        config_hash,
                        self.settings.negative_ttl,
                    );
                    let zone_id = match rejected {
                        Validation::Violation { zone_id, .. } => Some(zone_id),
                        _ => None,
                    };
                    last = LastFailure::Spatial { zone_id, reason };
                }
            }
        }

        tracing::warn!(attempts, %last, "All strategies failed");
        Err(BrokerError::Exhausted { attempts, last })
    }

    /// A stop with no portal may not sit inside a forbidden zone: it could
    /// never be reached legally, and retrying cannot fix configuration.
    fn check_zone_access(&self, stops: &[Stop]) -> Result<()> {
        for stop in stops {
            if self.config.find_portal(&stop.name).is_some() {
                continue;
            }
            let point = stop.point();
            for zone in self.config.forbidden_zones() {
                if zone.bbox().contains(point) && point_in_polygon(point, &zone.geometry) {
                    tracing::error!(
                        stop = %stop.name,
                        zone = %zone.id,
                        "Stop inside restricted zone has no portal rule"
                    );
                    return Err(BrokerError::Config {
                        stop: stop.name.clone(),
                        zone: zone.display_name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Biased strategies first when the stops surround the sensitive zone
    fn select_strategies(&self, stops: &[Stop]) -> Vec<Strategy> {
        let sensitive = self
            .settings
            .sensitive_zone_id
            .as_deref()
            .and_then(|id| self.config.zone(id));
        if let Some(zone) = sensitive {
            let points: Vec<Point> = stops.iter().map(Stop::point).collect();
            if BBox::of(&points).intersects(&zone.bbox()) {
                tracing::info!(
                    zone = %zone.id,
                    "Stops overlap sensitive zone, enabling biased strategies"
                );
                return vec![
                    Strategy::PortalsPlusHighway,
                    Strategy::PortalsPlusCity,
                    Strategy::PortalsOnly,
                ];
            }
        }

        vec![Strategy::PortalsOnly]
    }
}

fn validate_request(stops: &[Stop]) -> Result<()> {
    if stops.len() < 2 {
        return Err(BrokerError::InvalidRequest(format!(
            "at least 2 stops required, got {}",
            stops.len()
        )));
    }
    if let Some(bad) = stops.iter().find(|s| !s.has_valid_coordinates()) {
        return Err(BrokerError::InvalidRequest(format!(
            "stop '{}' has invalid coordinates ({}, {})",
            bad.name, bad.lat, bad.lon
        )));
    }
    Ok(())
}

/// Deterministic, direction-stable order: latitude descending
fn normalize(mut stops: Vec<Stop>) -> Vec<Stop> {
    stops.sort_by(|a, b| b.lat.total_cmp(&a.lat));
    stops
}

fn record_cache_lookup(result: &'static str) {
    metrics::counter!("geofence_cache_lookups_total", "result" => result).increment(1);
}

fn record_attempt(strategy: Strategy, outcome: &'static str) {
    metrics::counter!(
        "geofence_strategy_attempts_total",
        "strategy" => strategy.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

fn log_route(strategy: Strategy, response: &RouteResponse) {
    let Some(route) = response.primary() else {
        return;
    };
    tracing::info!(
        %strategy,
        legs = route.legs.len(),
        distance_m = route.distance,
        "Route accepted"
    );
    tracing::debug!(
        start = ?route.geometry.coordinates.first(),
        end = ?route.geometry.coordinates.last(),
        waypoints = response.waypoints.len(),
        "Route geometry"
    );
}
