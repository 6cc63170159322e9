//! HTTP client for an OSRM-compatible routing provider

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;

use geofence_core::constants;
use geofence_core::{Point, RouteResponse};

use crate::breaker::{CircuitBreaker, CircuitSnapshot};
use crate::error::{ClientError, Result};

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 256;

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Provider root, e.g. `https://router.project-osrm.org`
    pub base_url: String,
    /// Routing profile path segment
    pub profile: String,
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub max_concurrency: usize,
    /// Per-call timeout used by [`UpstreamRouteClient::get_route_default`]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            failure_threshold: constants::FAILURE_THRESHOLD,
            cooldown: constants::CIRCUIT_COOLDOWN,
            max_concurrency: constants::MAX_CONCURRENCY,
            timeout: constants::UPSTREAM_TIMEOUT,
        }
    }
}

/// Routing provider client with a shared circuit breaker and concurrency cap
pub struct UpstreamRouteClient {
    http: Client,
    base_url: String,
    profile: String,
    timeout: Duration,
    breaker: CircuitBreaker,
    permits: Semaphore,
}

impl UpstreamRouteClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self::with_http(http, config))
    }

    /// Use an existing reqwest client (shared connection pool)
    pub fn with_http(http: Client, config: ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile,
            timeout: config.timeout,
            breaker: CircuitBreaker::new(config.failure_threshold, config.cooldown),
            permits: Semaphore::new(config.max_concurrency.max(1)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn circuit(&self) -> CircuitSnapshot {
        self.breaker.snapshot()
    }

    /// Upstream calls that could start right now without waiting
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Request URL for a coordinate list
    pub fn route_url(&self, coords: &[Point]) -> String {
        let coords = coords
            .iter()
            .map(|p| format!("{:.5},{:.5}", p.lon, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/route/v1/{}/{}?geometries=geojson&overview=full&steps=true",
            self.base_url, self.profile, coords
        )
    }

    pub async fn get_route_default(&self, coords: &[Point]) -> Result<RouteResponse> {
        self.get_route(coords, self.timeout).await
    }

    /// Request a route through `coords` (in travel order).
    ///
    /// Fails fast with [`ClientError::CircuitOpen`] while the circuit is open.
    pub async fn get_route(&self, coords: &[Point], timeout: Duration) -> Result<RouteResponse> {
        let permit = self.breaker.acquire().map_err(|retry_in| {
            metrics::counter!("geofence_upstream_requests_total", "outcome" => "rejected")
                .increment(1);
            ClientError::CircuitOpen { retry_in }
        })?;

        let url = self.route_url(coords);
        tracing::debug!(coords = coords.len(), trial = permit.is_trial(), "Requesting route");

        // The wait for a slot and the exchange share one timeout
        let queued = Instant::now();
        let slot = match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Ok(slot) => slot.map_err(|_| ClientError::Closed)?,
            Err(_) => return Err(queue_timeout(queued.elapsed())),
        };
        let remaining = timeout.saturating_sub(queued.elapsed());
        if remaining.is_zero() {
            return Err(queue_timeout(queued.elapsed()));
        }

        let started = Instant::now();
        let exchange = self.exchange(&url, remaining).await;
        drop(slot);
        metrics::histogram!("geofence_upstream_latency_seconds")
            .record(started.elapsed().as_secs_f64());

        match exchange {
            Err(e) => {
                permit.failure();
                record_outcome("network_error");
                tracing::warn!(error = %e, timeout = e.is_timeout(), "Upstream connection error");
                Err(ClientError::Http(e))
            }
            Ok((status, body)) if status.is_server_error() => {
                permit.failure();
                record_outcome("server_error");
                tracing::warn!(status = status.as_u16(), "Upstream server error");
                Err(ClientError::Upstream {
                    status: status.as_u16(),
                    message: error_message(&body),
                })
            }
            Ok((status, body)) => {
                // Anything short of 5xx shows the provider is up
                permit.success();
                if !status.is_success() {
                    record_outcome("client_error");
                    return Err(ClientError::Upstream {
                        status: status.as_u16(),
                        message: error_message(&body),
                    });
                }
                record_outcome("ok");
                serde_json::from_slice(&body)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))
            }
        }
    }

    async fn exchange(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<(StatusCode, Vec<u8>), reqwest::Error> {
        let resp = self.http.get(url).timeout(timeout).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();
        Ok((status, body))
    }
}

fn queue_timeout(waited: Duration) -> ClientError {
    record_outcome("queue_timeout");
    tracing::warn!(
        waited_ms = waited.as_millis() as u64,
        "No upstream slot within call timeout"
    );
    ClientError::QueueTimeout { waited }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("geofence_upstream_requests_total", "outcome" => outcome).increment(1);
}

fn error_message(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(MAX_ERROR_BODY)
        .collect()
}

/// Builder for UpstreamRouteClient
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                ..ClientConfig::default()
            },
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.profile = profile.into();
        self
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    pub fn max_concurrency(mut self, permits: usize) -> Self {
        self.config.max_concurrency = permits;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<UpstreamRouteClient> {
        UpstreamRouteClient::new(self.config)
    }
}
