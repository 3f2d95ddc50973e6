//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::ServerConfig;
use crate::ws::{HubConfig, HubHandle};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Submit-side of the connection hub
    pub hub: HubHandle,
    /// Per-connection tunables handed to each accepted WebSocket
    pub hub_config: HubConfig,
    /// Listener configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// Wall-clock start time reported by the stats endpoint
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState around a running hub
    pub fn new(hub: HubHandle, hub_config: HubConfig, config: ServerConfig) -> Self {
        Self {
            hub,
            hub_config,
            config: Arc::new(config),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get the current number of connected clients
    pub fn connection_count(&self) -> usize {
        self.hub.connection_count()
    }
}
