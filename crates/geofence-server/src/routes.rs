//! HTTP routes

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use geofence_client::CircuitSnapshot;
use geofence_core::Stop;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::BrokerError;
use crate::state::SharedState;

/// Route request body
#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub stops: Vec<Stop>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub config_hash: String,
    pub zones: usize,
    pub portals: usize,
    pub circuit: CircuitSnapshot,
    pub cache_entries: usize,
    pub uptime_secs: u64,
}

/// Create the router
pub fn create_router(state: SharedState) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the router with a Prometheus `/metrics` endpoint
pub fn create_router_with_metrics(state: SharedState, handle: PrometheusHandle) -> Router {
    api_routes()
        .route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/route", post(route))
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let broker = &state.broker;
    let config = broker.config();
    Json(HealthResponse {
        status: "ok",
        config_hash: config.config_hash().to_string(),
        zones: config.zones().len(),
        portals: config.portals().len(),
        circuit: broker.client().circuit(),
        cache_entries: broker.cache().len(),
        uptime_secs: state.uptime_secs(),
    })
}

async fn route(
    State(state): State<SharedState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Response, BrokerError> {
    let Json(request) = body.map_err(|e| BrokerError::InvalidRequest(e.body_text()))?;
    let route = state.broker.get_route(request.stops).await?;
    Ok(Json(route.as_ref()).into_response())
}
