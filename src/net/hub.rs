//! Central broadcast hub
//!
//! Producers (handlers, the game loop, the disconnect path) enqueue
//! addressed messages with a non-blocking send; a single hub task serialises
//! each message once and fans it out to the bounded per-client queues. A
//! full queue anywhere drops the message: the next snapshot makes the
//! client whole again.
//!
//! Lock discipline: the hub registry lock is never taken while the world
//! lock is held. Producers go through the hub channel instead.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::game::constants::net;
use crate::net::protocol::{Outbox, ServerMessage, Target};

/// Why a connection could not be admitted
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("connection cap of {0} reached")]
    CapacityReached(usize),
}

/// Rolling-window message counter for per-connection rate caps
#[derive(Debug)]
pub struct RateWindow {
    count: u32,
    window_start: std::time::Instant,
}

impl RateWindow {
    pub fn new() -> Self {
        Self {
            count: 0,
            window_start: std::time::Instant::now(),
        }
    }

    /// Count one event; false once the cap for the current window is blown
    pub fn check(&mut self, max_per_window: u32, window: std::time::Duration) -> bool {
        let now = std::time::Instant::now();
        if now.duration_since(self.window_start) >= window {
            self.window_start = now;
            self.count = 0;
        }
        self.count += 1;
        self.count <= max_per_window
    }
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-side handle for one connected client
#[derive(Debug)]
pub struct ClientHandle {
    pub id: Uuid,
    /// Pre-serialised outbound frames, bounded; drop on full
    pub sender: mpsc::Sender<Arc<str>>,
    /// Owned player slot, -1 while not logged in
    pub player_id: AtomicI64,
    /// Team flag cache for targeted team delivery
    pub team: AtomicU8,
    /// Set once the client has quit; blocks further logins on the socket
    pub quitting: AtomicBool,
    /// Signals the write task to close the socket
    pub kick: Arc<Notify>,
    /// Slash-command rate limiter
    pub slash_limiter: Mutex<RateWindow>,
}

impl ClientHandle {
    pub fn slot(&self) -> Option<usize> {
        let id = self.player_id.load(Ordering::Acquire);
        usize::try_from(id).ok()
    }

    pub fn set_slot(&self, slot: Option<usize>, team_flag: u8) {
        self.player_id
            .store(slot.map_or(-1, |s| s as i64), Ordering::Release);
        self.team.store(team_flag, Ordering::Release);
    }
}

/// The client registry plus the fan-out channel feeding the hub task
pub struct Hub {
    clients: RwLock<HashMap<Uuid, Arc<ClientHandle>>>,
    inbound: mpsc::Sender<(Target, ServerMessage)>,
}

impl Hub {
    /// Build the hub and the receiver half its task will drain
    pub fn new() -> (Arc<Self>, mpsc::Receiver<(Target, ServerMessage)>) {
        let (tx, rx) = mpsc::channel(net::HUB_QUEUE);
        (
            Arc::new(Self {
                clients: RwLock::new(HashMap::new()),
                inbound: tx,
            }),
            rx,
        )
    }

    /// Register a connection, refusing past the connection cap
    pub fn register(
        &self,
        id: Uuid,
    ) -> Result<(Arc<ClientHandle>, mpsc::Receiver<Arc<str>>), RegisterError> {
        let mut clients = self.clients.write();
        if clients.len() >= net::MAX_CONNECTIONS {
            return Err(RegisterError::CapacityReached(net::MAX_CONNECTIONS));
        }
        let (tx, rx) = mpsc::channel(net::CLIENT_QUEUE);
        let handle = Arc::new(ClientHandle {
            id,
            sender: tx,
            player_id: AtomicI64::new(-1),
            team: AtomicU8::new(0),
            quitting: AtomicBool::new(false),
            kick: Arc::new(Notify::new()),
            slash_limiter: Mutex::new(RateWindow::new()),
        });
        clients.insert(id, handle.clone());
        Ok((handle, rx))
    }

    pub fn unregister(&self, id: Uuid) {
        self.clients.write().remove(&id);
    }

    pub fn connection_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Non-blocking enqueue toward the hub task; drops on a full channel
    pub fn send(&self, target: Target, message: ServerMessage) {
        if self.inbound.try_send((target, message)).is_err() {
            warn!("hub channel full, dropping message");
        }
    }

    /// Drain a tick's deferred outbox into the hub channel
    pub fn flush(&self, outbox: Outbox) {
        for (target, message) in outbox.queue {
            self.send(target, message);
        }
    }

    /// Deliver one message to its audience. Runs on the hub task.
    fn deliver(&self, target: Target, message: &ServerMessage) {
        let frame: Arc<str> = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("failed to serialise outbound message: {e}");
                return;
            }
        };

        let clients = self.clients.read();
        match target {
            Target::All => {
                for client in clients.values() {
                    if client.sender.try_send(frame.clone()).is_err() {
                        debug!(client = %client.id, "outbound queue full, dropped");
                    }
                }
            }
            Target::Team(flag) => {
                for client in clients.values() {
                    if client.team.load(Ordering::Acquire) == flag
                        && client.sender.try_send(frame.clone()).is_err()
                    {
                        debug!(client = %client.id, "outbound queue full, dropped");
                    }
                }
            }
            Target::Player(slot) => {
                for client in clients.values() {
                    if client.slot() == Some(slot) {
                        if client.sender.try_send(frame.clone()).is_err() {
                            debug!(client = %client.id, "outbound queue full, dropped");
                        }
                        break;
                    }
                }
            }
            Target::Client(id) => {
                if let Some(client) = clients.get(&id) {
                    if client.sender.try_send(frame).is_err() {
                        debug!(client = %id, "outbound queue full, dropped");
                    }
                }
            }
        }
    }

    /// The hub task body: drain the channel until every sender is gone
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<(Target, ServerMessage)>) {
        while let Some((target, message)) = rx.recv().await {
            self.deliver(target, &message);
        }
        debug!("hub task exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{ChatLine, MessageKind};

    fn text_message(text: &str) -> ServerMessage {
        ServerMessage::Message(ChatLine::notice(MessageKind::Info, text))
    }

    #[tokio::test]
    async fn test_register_and_capacity() {
        let (hub, _rx) = Hub::new();
        let mut handles = Vec::new();
        for _ in 0..net::MAX_CONNECTIONS {
            handles.push(hub.register(Uuid::new_v4()).unwrap());
        }
        assert_eq!(
            hub.register(Uuid::new_v4()).unwrap_err(),
            RegisterError::CapacityReached(net::MAX_CONNECTIONS)
        );

        let (first, _) = &handles[0];
        hub.unregister(first.id);
        assert!(hub.register(Uuid::new_v4()).is_ok());
    }

    #[tokio::test]
    async fn test_deliver_all_and_targeted() {
        let (hub, _rx) = Hub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (ha, mut rxa) = hub.register(a).unwrap();
        let (hb, mut rxb) = hub.register(b).unwrap();
        ha.set_slot(Some(3), 1);
        hb.set_slot(Some(7), 2);

        hub.deliver(Target::All, &text_message("everyone"));
        assert!(rxa.try_recv().unwrap().contains("everyone"));
        assert!(rxb.try_recv().unwrap().contains("everyone"));

        hub.deliver(Target::Player(3), &text_message("just you"));
        assert!(rxa.try_recv().unwrap().contains("just you"));
        assert!(rxb.try_recv().is_err());

        hub.deliver(Target::Team(2), &text_message("team only"));
        assert!(rxa.try_recv().is_err());
        assert!(rxb.try_recv().unwrap().contains("team only"));

        hub.deliver(Target::Client(a), &text_message("by id"));
        assert!(rxa.try_recv().unwrap().contains("by id"));
    }

    #[tokio::test]
    async fn test_full_queue_drops_silently() {
        let (hub, _rx) = Hub::new();
        let id = Uuid::new_v4();
        let (_handle, mut rx) = hub.register(id).unwrap();

        for i in 0..net::CLIENT_QUEUE + 50 {
            hub.deliver(Target::All, &text_message(&format!("m{i}")));
        }
        // The queue holds exactly its bound; the rest were dropped
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, net::CLIENT_QUEUE);
    }

    #[test]
    fn test_rate_window() {
        let mut window = RateWindow::new();
        let dur = std::time::Duration::from_secs(60);
        for _ in 0..5 {
            assert!(window.check(5, dur));
        }
        assert!(!window.check(5, dur));
    }

    #[tokio::test]
    async fn test_hub_task_end_to_end() {
        let (hub, rx) = Hub::new();
        let id = Uuid::new_v4();
        let (_handle, mut client_rx) = hub.register(id).unwrap();

        let task = tokio::spawn(hub.clone().run(rx));
        hub.send(Target::All, text_message("routed"));

        let frame = tokio::time::timeout(std::time::Duration::from_secs(1), client_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains("routed"));

        drop(hub);
        task.abort();
    }
}
