//! Geofenced route broker server

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use geofence_client::ClientConfig;
use geofence_core::{constants, ViaAnchors};
use geofence_server::{
    build_state, create_router, create_router_with_metrics, init_prometheus_recorder,
    BrokerSettings, ServerConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "geofence-server")]
#[command(about = "Zone-aware routing broker in front of an OSRM-compatible provider")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:5001")]
    listen: String,

    /// Routing provider base URL
    #[arg(long, default_value = "https://router.project-osrm.org")]
    upstream_url: String,

    /// Routing profile
    #[arg(long, default_value = "driving")]
    profile: String,

    /// Zones document
    #[arg(long, default_value = "config/zones.json")]
    zones: PathBuf,

    /// Portals document
    #[arg(long, default_value = "config/portals.json")]
    portals: PathBuf,

    /// Wall-clock budget per route request
    #[arg(long, default_value_t = constants::TIME_BUDGET.as_secs_f64())]
    time_budget_secs: f64,

    /// Timeout for each upstream call
    #[arg(long, default_value_t = constants::UPSTREAM_TIMEOUT.as_secs_f64())]
    upstream_timeout_secs: f64,

    /// Result cache entries (0 disables caching)
    #[arg(long, default_value_t = constants::CACHE_CAPACITY)]
    cache_capacity: usize,

    #[arg(long, default_value_t = constants::POSITIVE_TTL.as_secs())]
    positive_ttl_secs: u64,

    #[arg(long, default_value_t = constants::NEGATIVE_TTL.as_secs())]
    negative_ttl_secs: u64,

    /// Consecutive upstream failures that open the circuit
    #[arg(long, default_value_t = constants::FAILURE_THRESHOLD)]
    failure_threshold: u32,

    #[arg(long, default_value_t = constants::CIRCUIT_COOLDOWN.as_secs_f64())]
    cooldown_secs: f64,

    /// Concurrent upstream calls
    #[arg(long, default_value_t = constants::MAX_CONCURRENCY)]
    max_concurrency: usize,

    /// Zone that enables the biased strategies (empty disables them)
    #[arg(long, default_value = constants::SENSITIVE_ZONE_ID)]
    sensitive_zone: String,

    /// Do not expose /metrics
    #[arg(long)]
    no_metrics: bool,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig> {
        let sensitive_zone_id = Some(self.sensitive_zone.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(ServerConfig {
            zones_path: self.zones.clone(),
            portals_path: self.portals.clone(),
            client: ClientConfig {
                base_url: self.upstream_url.clone(),
                profile: self.profile.clone(),
                failure_threshold: self.failure_threshold,
                cooldown: secs("cooldown-secs", self.cooldown_secs)?,
                max_concurrency: self.max_concurrency,
                timeout: secs("upstream-timeout-secs", self.upstream_timeout_secs)?,
            },
            broker: BrokerSettings {
                time_budget: secs("time-budget-secs", self.time_budget_secs)?,
                upstream_timeout: secs("upstream-timeout-secs", self.upstream_timeout_secs)?,
                positive_ttl: Duration::from_secs(self.positive_ttl_secs),
                negative_ttl: Duration::from_secs(self.negative_ttl_secs),
                sensitive_zone_id,
                anchors: ViaAnchors::default(),
            },
            cache_capacity: self.cache_capacity,
        })
    }
}

fn secs(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| anyhow::anyhow!("invalid --{flag} {value}: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "geofence_server=info,geofence_client=info,geofence_core=info,tower_http=info"
                    .into()
            }),
        )
        .init();

    let args = Args::parse();
    let config = args.server_config()?;

    tracing::info!(
        upstream = %config.client.base_url,
        zones = %config.zones_path.display(),
        portals = %config.portals_path.display(),
        budget_secs = config.broker.time_budget.as_secs_f64(),
        "Starting geofence route broker"
    );

    let state = build_state(&config)?;
    let app = if args.no_metrics {
        create_router(state)
    } else {
        create_router_with_metrics(state, init_prometheus_recorder()?)
    };

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
