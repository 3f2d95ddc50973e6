//! # Relay
//!
//! Real-time WebSocket fan-out relay: every message a connected client sends
//! is broadcast to all connected clients. No persistence, no topics, no
//! delivery guarantees beyond best effort.
//!
//! ## Features
//!
//! - **Serialized fan-out**: a single hub control loop owns the connection
//!   registry, so membership changes and broadcasts never race
//! - **Backpressure by eviction**: a client whose bounded outbound queue
//!   fills up is disconnected instead of buffered without bound
//! - **Keepalive heartbeat**: periodic pings with an idle deadline separate
//!   quiet-but-alive peers from dead ones
//! - **Opaque payloads**: relayed bytes are never parsed or validated
//!
//! ## Modules
//!
//! - [`ws`]: the connection hub and per-connection pump pair
//! - [`api`]: HTTP surface with Axum (WebSocket route, health, stats)
//! - [`config`]: layered TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay::api::{serve, AppState};
//! use relay::config::ServerConfig;
//! use relay::ws::{Hub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The hub control loop runs for the process lifetime.
//!     let (hub, handle) = Hub::new();
//!     tokio::spawn(hub.run());
//!
//!     let config = ServerConfig::default();
//!     let state = AppState::new(handle, HubConfig::default(), config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod ws;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, ApiResult, AppState};

pub use config::{Config, ConfigError, LoggingConfig, RelayConfig, ServerConfig};

pub use ws::{websocket_handler, ClientId, Hub, HubConfig, HubHandle, Payload};
