//! Server assembly

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use geofence_client::{ClientConfig, UpstreamRouteClient};
use geofence_core::{constants, RoutingConfig};

use crate::broker::{BrokerSettings, RouteBroker};
use crate::cache::ResultCache;
use crate::state::{create_shared_state, SharedState};

/// Everything needed to build a broker from files and flags
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub zones_path: PathBuf,
    pub portals_path: PathBuf,
    pub client: ClientConfig,
    pub broker: BrokerSettings,
    pub cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            zones_path: PathBuf::from("config/zones.json"),
            portals_path: PathBuf::from("config/portals.json"),
            client: ClientConfig::default(),
            broker: BrokerSettings::default(),
            cache_capacity: constants::CACHE_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.client.base_url = url.into();
        self
    }

    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.broker.time_budget = budget;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Load routing configuration and wire up the broker.
///
/// Missing or malformed configuration degrades to an empty rule set; only a
/// failure to construct the HTTP client is an error.
pub fn build_broker(config: &ServerConfig) -> anyhow::Result<RouteBroker> {
    let routing = RoutingConfig::load(&config.zones_path, &config.portals_path);

    let client = UpstreamRouteClient::new(config.client.clone())?;
    tracing::info!(
        upstream = %client.base_url(),
        profile = %config.client.profile,
        "Upstream client ready"
    );

    Ok(RouteBroker::new(
        Arc::new(routing),
        Arc::new(client),
        Arc::new(ResultCache::new(config.cache_capacity)),
        config.broker.clone(),
    ))
}

pub fn build_state(config: &ServerConfig) -> anyhow::Result<SharedState> {
    Ok(create_shared_state(build_broker(config)?))
}
