//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::relay::{Relay, RelayConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let relay = Arc::new(Relay::new(RelayConfig {
            min_score_interval: config.min_score_interval,
        }));

        Self { config, relay }
    }
}
