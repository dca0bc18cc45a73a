//! Configuration module for the classroom poll backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;

/// Default number of events buffered per WebSocket subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Broadcast buffer size; slow subscribers skip events beyond this
    pub event_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("POLL_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:4000".to_string())
            .parse()
            .expect("Invalid POLL_BIND_ADDR format");

        let log_level = env::var("POLL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let event_capacity = env::var("POLL_EVENT_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|capacity| *capacity > 0)
            .unwrap_or(DEFAULT_EVENT_CAPACITY);

        Self {
            bind_addr,
            log_level,
            event_capacity,
        }
    }
}
