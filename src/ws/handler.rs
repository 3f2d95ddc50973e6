//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and wires each accepted connection to
//! the hub: one bounded outbound queue, one read pump, one write pump.

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::client::{read_pump, write_pump};
use super::hub::{HubConfig, HubHandle};
use crate::api::AppState;

/// WebSocket upgrade handler
///
/// This is the entry point for relay connections. It upgrades the HTTP
/// request and hands the socket to the per-connection task; a failed
/// handshake is rejected by axum before any client state exists.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = state.hub.clone();
    let config = state.hub_config.clone();
    ws.max_message_size(config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, hub, config))
}

/// Service an established connection until either pump exits
///
/// The read and write pumps run as separate tasks; whichever exits first
/// drags the other down, after which the client is unregistered exactly once
/// from this path. A backpressure eviction by the hub may race this
/// unregister; the hub treats the second request as a no-op.
async fn handle_socket(socket: WebSocket, hub: HubHandle, config: HubConfig) {
    let (sink, stream) = socket.split();

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let id = hub.register(tx);

    let idle_timeout = config.idle_timeout;
    let mut write_task = tokio::spawn(write_pump(id, sink, rx, config));
    let mut read_task = tokio::spawn(read_pump(id, stream, hub.clone(), idle_timeout));

    tokio::select! {
        _ = &mut write_task => {
            read_task.abort();
        }
        _ = &mut read_task => {
            write_task.abort();
        }
    }

    hub.unregister(id);
}
