//! Connection Hub
//!
//! Tracks every live WebSocket client and fans broadcast messages out to all
//! of them. The registry is owned by a single control-loop task and is only
//! ever touched from inside that loop; registration, unregistration and
//! broadcasting are submitted through channels, so membership changes and
//! fan-out never race each other.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::client::Payload;
use crate::config::RelayConfig;

/// Unique identifier for a connected client
pub type ClientId = Uuid;

/// Per-connection tunables shared by the upgrade handler and both pumps
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each client's outbound queue
    pub queue_capacity: usize,
    /// Maximum inbound message size in bytes
    pub max_message_size: usize,
    /// How long a client may stay silent (no data, no pong) before it is
    /// considered dead
    pub idle_timeout: Duration,
    /// How often a ping is sent; must be strictly shorter than `idle_timeout`
    pub ping_period: Duration,
    /// Deadline for a single write to the socket
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_message_size: 512,
            idle_timeout: Duration::from_secs(60),
            ping_period: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&RelayConfig> for HubConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            max_message_size: config.max_message_bytes,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            ping_period: Duration::from_secs(config.ping_period_secs),
            write_timeout: Duration::from_secs(config.write_timeout_secs),
        }
    }
}

/// A new client entering the registry
struct Registration {
    id: ClientId,
    sender: mpsc::Sender<Payload>,
}

/// The hub control loop state
///
/// Created together with its [`HubHandle`] via [`Hub::new`]; call [`Hub::run`]
/// on a dedicated task for the lifetime of the process.
pub struct Hub {
    /// Live clients, keyed by id; each value is the sole sender for that
    /// client's outbound queue, so removing an entry closes the queue
    clients: HashMap<ClientId, mpsc::Sender<Payload>>,
    register_rx: mpsc::UnboundedReceiver<Registration>,
    unregister_rx: mpsc::UnboundedReceiver<ClientId>,
    broadcast_rx: mpsc::UnboundedReceiver<Payload>,
    /// Membership count, published after every registry change
    members_tx: watch::Sender<usize>,
}

/// Cloneable submit-side of the hub
///
/// The only way to reach the registry from outside the control loop.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::UnboundedSender<Registration>,
    unregister_tx: mpsc::UnboundedSender<ClientId>,
    broadcast_tx: mpsc::UnboundedSender<Payload>,
    members_rx: watch::Receiver<usize>,
}

impl Hub {
    /// Create a hub and the handle used to submit work to it
    pub fn new() -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let (members_tx, members_rx) = watch::channel(0);

        let hub = Self {
            clients: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            members_tx,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            members_rx,
        };
        (hub, handle)
    }

    /// Run the control loop until every handle has been dropped
    ///
    /// Events are processed one at a time. When more than one intake channel
    /// is ready the winner is unspecified; no priority exists between
    /// registration, unregistration and broadcasting.
    ///
    /// The broadcast intake is unbounded: if messages arrive faster than the
    /// loop drains them for a sustained period, the backlog grows without
    /// limit.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(registration) = self.register_rx.recv() => self.register(registration),
                Some(id) = self.unregister_rx.recv() => self.unregister(id),
                Some(payload) = self.broadcast_rx.recv() => self.broadcast(payload),
                else => break,
            }
        }
        tracing::debug!("hub control loop stopped");
    }

    fn register(&mut self, registration: Registration) {
        let Registration { id, sender } = registration;
        self.clients.insert(id, sender);
        self.members_tx.send_replace(self.clients.len());
        tracing::info!(
            client_id = %id,
            clients = self.clients.len(),
            "client connected"
        );
    }

    /// Remove a client and close its outbound queue
    ///
    /// A no-op for unknown ids: the read-pump exit and a backpressure
    /// eviction can both request removal of the same client, and the queue
    /// must only ever be closed once.
    fn unregister(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            self.members_tx.send_replace(self.clients.len());
            tracing::info!(
                client_id = %id,
                clients = self.clients.len(),
                "client disconnected"
            );
        }
    }

    /// Fan a payload out to every registered client
    ///
    /// Enqueueing never blocks: a client whose queue is full cannot keep up
    /// and is evicted, so one slow consumer cannot stall delivery to the
    /// rest.
    fn broadcast(&mut self, payload: Payload) {
        let mut evicted = Vec::new();

        for (id, sender) in &self.clients {
            match sender.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(client_id = %id, "outbound queue full, evicting slow client");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    // The write pump is already gone; drop the entry now
                    // rather than waiting for the unregister request.
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            self.unregister(id);
        }

        tracing::trace!(
            bytes = payload.len(),
            clients = self.clients.len(),
            "broadcast delivered"
        );
    }
}

impl HubHandle {
    /// Submit a new client; returns the id assigned to it
    ///
    /// `sender` is the submit-side of the client's bounded outbound queue.
    /// The hub keeps the only copy, so unregistering the client closes the
    /// queue.
    pub fn register(&self, sender: mpsc::Sender<Payload>) -> ClientId {
        let id = Uuid::new_v4();
        let _ = self.register_tx.send(Registration { id, sender });
        id
    }

    /// Submit removal of a client; safe to call more than once per client
    pub fn unregister(&self, id: ClientId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Submit a payload for delivery to every registered client
    pub fn broadcast(&self, payload: Payload) {
        let _ = self.broadcast_tx.send(payload);
    }

    /// Number of currently registered clients
    pub fn connection_count(&self) -> usize {
        *self.members_rx.borrow()
    }

    /// Watch membership changes as the control loop processes them
    pub fn membership(&self) -> watch::Receiver<usize> {
        self.members_rx.clone()
    }

    /// Whether the control loop is still consuming submissions
    pub fn is_running(&self) -> bool {
        !self.register_tx.is_closed()
    }
}
