//! Mock OSRM-compatible upstream shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

pub const ZONES: &str = r#"{
    "zones": [{
        "id": "ZONE_BEACH_RD",
        "name": "Beach Road",
        "rule": "FORBIDDEN_SEGMENT",
        "geometry": [[11.24, 75.76], [11.24, 75.78], [11.28, 75.78], [11.28, 75.76]]
    }]
}"#;

pub const PORTALS: &str = r#"{
    "portals": {
        "Lighthouse": {
            "type": "STANDARD",
            "entry_gate": {"lat": 11.29, "lon": 75.75},
            "exit_gate": {"lat": 11.29, "lon": 75.75}
        }
    }
}"#;

/// Geometry straight through the beach zone
const THROUGH_ZONE: [[f64; 2]; 2] = [[75.77, 11.30], [75.77, 11.22]];

#[derive(Default)]
pub struct MockState {
    hits: AtomicUsize,
    status: AtomicU16,
    through_zone: AtomicBool,
    delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

pub struct MockUpstream {
    pub url: String,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        state.status.store(200, Ordering::SeqCst);

        let app = Router::new()
            .route("/route/v1/:profile/:coords", get(route))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    /// Answer every request with a route crossing the beach zone
    pub fn route_through_zone(&self, enabled: bool) {
        self.state.through_zone.store(enabled, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Coordinate path segments received so far, oldest first
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn route(
    State(state): State<Arc<MockState>>,
    Path((_profile, coords)): Path<(String, String)>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(coords.clone());

    let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap();
    if !status.is_success() {
        return (status, "upstream unavailable").into_response();
    }

    let geometry: Vec<[f64; 2]> = if state.through_zone.load(Ordering::SeqCst) {
        THROUGH_ZONE.to_vec()
    } else {
        parse_coords(&coords)
    };

    Json(json!({
        "code": "Ok",
        "routes": [{
            "distance": 1234.5,
            "duration": 321.0,
            "weight_name": "routability",
            "legs": [{"summary": "mock"}],
            "geometry": {"type": "LineString", "coordinates": geometry}
        }],
        "waypoints": []
    }))
    .into_response()
}

/// `lon,lat;lon,lat` into GeoJSON pairs
pub fn parse_coords(coords: &str) -> Vec<[f64; 2]> {
    coords
        .split(';')
        .map(|pair| {
            let (lon, lat) = pair.split_once(',').unwrap();
            [lon.parse().unwrap(), lat.parse().unwrap()]
        })
        .collect()
}

/// A local address nothing is listening on
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
