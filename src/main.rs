//! Relay Server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loaded from (first found wins): `--config <path>`, the user config
//! directory, `/etc/relay/config.toml`, `./relay.toml`.
//!
//! Environment variables:
//! - `RELAY_HOST`: Host to bind to (default: 0.0.0.0)
//! - `RELAY_PORT`: Port to listen on (default: 8080)
//! - `RELAY_LOG_LEVEL`: Log level when RUST_LOG is unset (default: info)
//! - `RELAY_LOG_FORMAT`: "pretty" or "json" (default: pretty)
//! - `RUST_LOG`: Full tracing filter, overrides RELAY_LOG_LEVEL

use anyhow::Context;
use clap::Parser;
use relay::api::{serve, AppState};
use relay::config::{Config, LoggingConfig};
use relay::ws::{Hub, HubConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "relay", version, about = "Real-time WebSocket fan-out relay")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => Config::load_default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting relay v{}", env!("CARGO_PKG_VERSION"));
    config.validate().context("invalid configuration")?;

    tracing::info!(
        queue_capacity = config.relay.queue_capacity,
        max_message_bytes = config.relay.max_message_bytes,
        idle_timeout_secs = config.relay.idle_timeout_secs,
        ping_period_secs = config.relay.ping_period_secs,
        "Relay settings"
    );

    let (hub, handle) = Hub::new();
    tokio::spawn(hub.run());

    let state = AppState::new(
        handle,
        HubConfig::from(&config.relay),
        config.server.clone(),
    );
    serve(state, &config.server).await?;

    tracing::info!("Relay server stopped");
    Ok(())
}

/// Initialize tracing from the logging config
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("relay={},tower_http=debug", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
