//! End-to-end relay tests over real WebSocket connections.
//!
//! Each test binds an ephemeral listener, runs the full router against it
//! and drives it with tokio-tungstenite clients.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use relay::api::{build_router, AppState};
use relay::config::ServerConfig;
use relay::ws::{Hub, HubConfig, HubHandle};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Short keepalive windows so liveness tests finish quickly
fn fast_keepalive() -> HubConfig {
    HubConfig {
        idle_timeout: Duration::from_millis(400),
        ping_period: Duration::from_millis(100),
        write_timeout: Duration::from_secs(1),
        ..HubConfig::default()
    }
}

async fn spawn_relay(hub_config: HubConfig) -> (SocketAddr, HubHandle) {
    let (hub, handle) = Hub::new();
    tokio::spawn(hub.run());

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let router = build_router(AppState::new(handle.clone(), hub_config, config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, handle)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (client, _response) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

/// Wait until the hub has processed membership changes down to `expected`
async fn wait_for_members(handle: &HubHandle, expected: usize) {
    let mut members = handle.membership();
    timeout(
        Duration::from_secs(2),
        members.wait_for(|&count| count == expected),
    )
    .await
    .expect("membership did not settle")
    .expect("hub loop gone");
}

/// Next text frame, skipping keepalive traffic
async fn recv_text(client: &mut WsClient) -> String {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_message_reaches_every_connected_client() {
    let (addr, handle) = spawn_relay(HubConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    let mut c = connect(addr).await;
    wait_for_members(&handle, 3).await;

    a.send(Message::Text("hello".to_string())).await.unwrap();

    // Every client registered at broadcast time gets one copy, the sender
    // included.
    assert_eq!(recv_text(&mut a).await, "hello");
    assert_eq!(recv_text(&mut b).await, "hello");
    assert_eq!(recv_text(&mut c).await, "hello");

    // C goes away without a close handshake.
    drop(c);
    wait_for_members(&handle, 2).await;

    a.send(Message::Text("world".to_string())).await.unwrap();
    assert_eq!(recv_text(&mut a).await, "world");
    assert_eq!(recv_text(&mut b).await, "world");
    assert_eq!(handle.connection_count(), 2);
}

#[tokio::test]
async fn test_binary_frames_keep_their_kind() {
    let (addr, handle) = spawn_relay(HubConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_members(&handle, 2).await;

    a.send(Message::Binary(vec![0xde, 0xad, 0xbe, 0xef]))
        .await
        .unwrap();

    let frame = timeout(Duration::from_secs(2), b.next())
        .await
        .expect("timed out")
        .expect("connection ended")
        .expect("websocket error");
    assert_eq!(frame, Message::Binary(vec![0xde, 0xad, 0xbe, 0xef]));
}

#[tokio::test]
async fn test_quiet_but_responsive_client_stays_registered() {
    let (addr, handle) = spawn_relay(fast_keepalive()).await;

    let mut quiet = connect(addr).await;
    wait_for_members(&handle, 1).await;

    // Never send data, just keep polling the socket. Polling answers the
    // server's pings, and each pong restarts the idle deadline.
    let deadline = Instant::now() + Duration::from_millis(1200);
    while Instant::now() < deadline {
        match timeout(Duration::from_millis(50), quiet.next()).await {
            Ok(Some(Ok(_))) => {}
            Ok(_) => panic!("connection dropped while responsive"),
            Err(_) => {}
        }
    }

    // Three idle windows later we are still a member.
    assert_eq!(handle.connection_count(), 1);
}

#[tokio::test]
async fn test_unresponsive_client_is_dropped_after_idle_deadline() {
    let (addr, handle) = spawn_relay(fast_keepalive()).await;

    // Connect and then never poll the socket: pings go unanswered.
    let _silent = connect(addr).await;
    wait_for_members(&handle, 1).await;

    wait_for_members(&handle, 0).await;
}

#[tokio::test]
async fn test_oversized_message_disconnects_the_sender() {
    let config = HubConfig {
        max_message_size: 64,
        ..HubConfig::default()
    };
    let (addr, handle) = spawn_relay(config).await;

    let mut big_mouth = connect(addr).await;
    let mut other = connect(addr).await;
    wait_for_members(&handle, 2).await;

    big_mouth
        .send(Message::Text("x".repeat(1024)))
        .await
        .unwrap();
    wait_for_members(&handle, 1).await;

    // The oversized message was never relayed.
    other.send(Message::Text("still here".to_string())).await.unwrap();
    assert_eq!(recv_text(&mut other).await, "still here");
}
