//! Data Transfer Objects
//!
//! Response types for the HTTP endpoints, serialized to JSON. Relayed
//! WebSocket payloads never pass through these; they stay opaque.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Hub control loop status: "ok" or "stopped"
    pub hub: String,
    /// Currently connected clients
    pub connections: usize,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Crate version
    pub version: String,
}

/// Relay statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Currently connected clients
    pub connections: usize,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Wall-clock time the server started
    pub started_at: DateTime<Utc>,
    /// Crate version
    pub version: String,
}
