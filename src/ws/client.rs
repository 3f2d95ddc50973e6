//! Client Pumps
//!
//! The two tasks that service one WebSocket connection: the read pump pulls
//! inbound frames off the socket and forwards them to the hub, the write
//! pump drains the client's outbound queue back onto the socket and keeps
//! the connection alive with periodic pings. The write pump is the only
//! writer to its socket; the transport does not allow concurrent writers.

use std::io;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::hub::{ClientId, HubConfig, HubHandle};

/// Opaque unit relayed between peers
///
/// The hub never inspects the bytes; the frame kind a message arrived with
/// is the frame kind it leaves with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_message(self) -> Message {
        match self {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

/// Read side: forward every inbound message to the hub until the peer goes
/// away or stays silent past the idle deadline.
///
/// The deadline restarts on every inbound frame, including the pongs that
/// answer our pings, so an idle-but-alive peer is never dropped. The caller
/// owns cleanup: when this returns, it must unregister the client.
pub(crate) async fn read_pump(
    id: ClientId,
    mut stream: SplitStream<WebSocket>,
    hub: HubHandle,
    idle_timeout: Duration,
) {
    loop {
        let frame = match time::timeout(idle_timeout, stream.next()).await {
            Err(_) => {
                tracing::debug!(client_id = %id, "idle deadline lapsed");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(client_id = %id, error = %e, "read failed");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => hub.broadcast(Payload::Text(text)),
            Message::Binary(bytes) => hub.broadcast(Payload::Binary(bytes)),
            // axum answers pings on its own; both kinds matter here only as
            // proof of life, which restarting the timeout already gives us.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(reason) => {
                log_close(id, reason);
                break;
            }
        }
    }
}

/// Whether a close code signals an ordinary departure (navigating away or
/// dropping the connection without a handshake)
fn is_expected_close(code: u16) -> bool {
    code == close_code::AWAY || code == close_code::ABNORMAL
}

fn log_close(id: ClientId, reason: Option<CloseFrame<'static>>) {
    match reason {
        Some(frame) if !is_expected_close(frame.code) => {
            tracing::warn!(
                client_id = %id,
                code = frame.code,
                reason = %frame.reason,
                "unexpected close code"
            );
        }
        Some(frame) => {
            tracing::debug!(client_id = %id, code = frame.code, "peer closed connection");
        }
        None => {
            tracing::debug!(client_id = %id, "peer closed connection");
        }
    }
}

/// Write side: drain the outbound queue onto the socket and ping the peer
/// once per keepalive period.
///
/// Exits when the queue closes (the hub unregistered this client; one close
/// frame is sent first) or when any write fails or times out. It never
/// unregisters the client itself; dropping its half of the socket is enough
/// to fail the paired read pump.
pub(crate) async fn write_pump(
    id: ClientId,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Payload>,
    config: HubConfig,
) {
    let mut keepalive = time::interval_at(
        Instant::now() + config.ping_period,
        config.ping_period,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(payload) => {
                    if let Err(e) =
                        write_frame(&mut sink, payload.into_message(), config.write_timeout).await
                    {
                        tracing::debug!(client_id = %id, error = %e, "write failed");
                        break;
                    }
                }
                None => {
                    // The hub closed our queue; tell the peer we are done.
                    let close = Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: "".into(),
                    }));
                    let _ = write_frame(&mut sink, close, config.write_timeout).await;
                    break;
                }
            },
            _ = keepalive.tick() => {
                if let Err(e) =
                    write_frame(&mut sink, Message::Ping(Vec::new()), config.write_timeout).await
                {
                    tracing::debug!(client_id = %id, error = %e, "ping failed");
                    break;
                }
            }
        }
    }
}

/// Write one frame under the configured deadline
async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Message,
    deadline: Duration,
) -> Result<(), axum::Error> {
    match time::timeout(deadline, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(axum::Error::new(io::Error::new(
            io::ErrorKind::TimedOut,
            "write deadline exceeded",
        ))),
    }
}
