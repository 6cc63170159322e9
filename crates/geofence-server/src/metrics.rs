//! Prometheus metrics

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and describe broker metrics.
///
/// Fails if a recorder is already installed for this process.
pub fn init_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "geofence_route_requests_total",
        "Route requests by final outcome"
    );
    describe_counter!(
        "geofence_strategy_attempts_total",
        "Upstream-backed strategy attempts by strategy and outcome"
    );
    describe_counter!(
        "geofence_cache_lookups_total",
        "Result cache lookups (positive_hit, negative_hit, miss)"
    );
    describe_counter!(
        "geofence_upstream_requests_total",
        "Upstream routing calls by outcome"
    );
    describe_histogram!(
        "geofence_upstream_latency_seconds",
        Unit::Seconds,
        "Upstream routing call latency"
    );
    describe_gauge!(
        "geofence_circuit_state",
        "Circuit breaker state (0 closed, 1 half-open, 2 open)"
    );
}
