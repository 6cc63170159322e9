//! Shared server state

use std::sync::Arc;
use std::time::Instant;

use crate::broker::RouteBroker;

/// State shared by all request handlers
pub struct ServerState {
    pub broker: RouteBroker,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(broker: RouteBroker) -> Self {
        Self {
            broker,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<ServerState>;

pub fn create_shared_state(broker: RouteBroker) -> SharedState {
    Arc::new(ServerState::new(broker))
}
