//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated); permissive when unset
    pub client_origin: Option<String>,

    /// Minimum time between accepted score increases (anti-cheat gate)
    pub min_score_interval: Duration,
    /// How often the idle-room reaper sweeps
    pub reap_interval: Duration,
    /// Age at which a room still waiting for an opponent is evicted
    pub waiting_room_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PaaS platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN").ok(),

            min_score_interval: Duration::from_millis(env_u64("MIN_SCORE_INTERVAL_MS", 1000)?),
            reap_interval: Duration::from_secs(env_u64("REAP_INTERVAL_SECS", 300)?),
            waiting_room_ttl: Duration::from_secs(env_u64("WAITING_ROOM_TTL_SECS", 600)?),
        })
    }
}

/// Read an integer environment variable, falling back to a default when unset
fn env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidNumber(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),
}
