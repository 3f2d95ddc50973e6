//! WebSocket Relay Core
//!
//! Fans every inbound client message out to all connected clients.
//!
//! ## Architecture
//!
//! - **Hub**: single control loop owning the registry of live clients;
//!   consumes register, unregister and broadcast submissions
//! - **Client pumps**: per-connection read pump (socket → hub) and write
//!   pump (queue → socket, plus keepalive pings)
//! - **Handler**: WebSocket upgrade and pump wiring
//!
//! ## Usage
//!
//! Clients connect to `/ws`; anything they send is relayed verbatim to
//! every connected client:
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onmessage = (event) => {
//!   console.log('Received:', event.data);
//! };
//!
//! ws.onopen = () => {
//!   ws.send('hello, everyone');
//! };
//! ```
//!
//! A client that cannot keep up with the broadcast rate is disconnected
//! rather than buffered without bound, and a client that stops answering
//! keepalive pings is disconnected once the idle deadline lapses.

mod client;
mod handler;
mod hub;

pub use client::Payload;
pub use handler::websocket_handler;
pub use hub::{ClientId, Hub, HubConfig, HubHandle};
