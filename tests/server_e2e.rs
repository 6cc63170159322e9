//! HTTP surface tests: status codes and bodies over a real socket

mod common;

use std::sync::Arc;

use common::{MockUpstream, PORTALS, ZONES};
use geofence_client::ClientBuilder;
use geofence_core::RoutingConfig;
use geofence_server::{create_router, create_shared_state, BrokerSettings, ResultCache, RouteBroker};
use serde_json::{json, Value};

async fn start_server(upstream: &str) -> String {
    let broker = RouteBroker::new(
        Arc::new(RoutingConfig::from_json(ZONES, PORTALS).unwrap()),
        Arc::new(ClientBuilder::new(upstream).build().unwrap()),
        Arc::new(ResultCache::new(32)),
        BrokerSettings::default(),
    );
    let app = create_router(create_shared_state(broker));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_route(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/route", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_route_ok() {
    let mock = MockUpstream::start().await;
    let base = start_server(&mock.url).await;

    let (status, body) = post_route(
        &base,
        json!({"stops": [
            {"name": "Hill Top", "lat": 11.5, "lon": 76.4},
            {"name": "Tea Estate", "lat": 12.0, "lon": 76.5}
        ]}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["code"], "Ok");
    assert_eq!(body["routes"][0]["weight_name"], "routability");
    assert_eq!(
        body["routes"][0]["geometry"]["coordinates"],
        json!([[76.5, 12.0], [76.4, 11.5]])
    );
}

#[tokio::test]
async fn test_invalid_requests() {
    let mock = MockUpstream::start().await;
    let base = start_server(&mock.url).await;

    let (status, body) =
        post_route(&base, json!({"stops": [{"name": "Alone", "lat": 11.5, "lon": 76.4}]})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = post_route(&base, json!({"destinations": []})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn test_config_error_response() {
    let mock = MockUpstream::start().await;
    let base = start_server(&mock.url).await;

    let (status, body) = post_route(
        &base,
        json!({"stops": [
            {"name": "Town Hall", "lat": 11.30, "lon": 75.77},
            {"name": "Beach Kiosk", "lat": 11.26, "lon": 75.77}
        ]}),
    )
    .await;

    assert_eq!(status, 422);
    assert_eq!(body["code"], "CONFIG_ERROR");
    assert!(body["error"].as_str().unwrap().contains("Beach Kiosk"));
}

#[tokio::test]
async fn test_spatial_rejection_response() {
    let mock = MockUpstream::start().await;
    mock.route_through_zone(true);
    let base = start_server(&mock.url).await;

    let (status, body) = post_route(
        &base,
        json!({"stops": [
            {"name": "Town Hall", "lat": 11.30, "lon": 75.77},
            {"name": "Railway Station", "lat": 11.22, "lon": 75.77}
        ]}),
    )
    .await;

    assert_eq!(status, 422);
    assert_eq!(body["code"], "SPATIAL_VIOLATION");
    assert_eq!(
        body["error"],
        "All strategies failed. Last error: Spatial Violation: Intersects Beach Road"
    );
}

#[tokio::test]
async fn test_upstream_failure_response() {
    let mock = MockUpstream::start().await;
    mock.set_status(503);
    let base = start_server(&mock.url).await;

    let (status, body) = post_route(
        &base,
        json!({"stops": [
            {"name": "Hill Top", "lat": 11.5, "lon": 76.4},
            {"name": "Tea Estate", "lat": 12.0, "lon": 76.5}
        ]}),
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_health() {
    let mock = MockUpstream::start().await;
    let base = start_server(&mock.url).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["zones"], 1);
    assert_eq!(body["portals"], 1);
    assert_eq!(body["circuit"]["state"], "CLOSED");
    assert_eq!(body["config_hash"].as_str().unwrap().len(), 64);
}
