use std::collections::HashMap;

use tokio::sync::{Mutex, broadcast, mpsc};

use starbit_core::{AuthoritativeState, LobbySnapshot};

use crate::config::ServerConfig;

/// Everything the reliable server, datagram server, and tick broadcaster
/// share (spec §5: a single mutex guards the entire authoritative state).
pub struct Shared {
    pub config: ServerConfig,
    pub state: Mutex<AuthoritativeState>,
    /// Broadcast channel the reliable "maintain" handlers subscribe to; the
    /// join path publishes a fresh snapshot whenever the lobby changes or
    /// the game starts (spec §4.6).
    pub lobby_updates: broadcast::Sender<LobbySnapshot>,
    /// Per-username outbound queues for the datagram side. A writer task
    /// owns each `SendStream` and drains its queue; both the per-stream
    /// reader and the tick broadcaster push onto it, so a single task ever
    /// touches the underlying QUIC stream (spec §5's no-interleaved-writes
    /// requirement is implicit in "per-client sends happen under the lock").
    pub datagram_outboxes: Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl Shared {
    pub fn new(config: ServerConfig) -> Self {
        let state = AuthoritativeState::new(config.game.clone());
        let (lobby_updates, _) = broadcast::channel(32);
        Self {
            config,
            state: Mutex::new(state),
            lobby_updates,
            datagram_outboxes: Mutex::new(HashMap::new()),
        }
    }

    pub async fn register_datagram_outbox(
        &self,
        username: String,
        sender: mpsc::UnboundedSender<Vec<u8>>,
    ) {
        self.datagram_outboxes
            .lock()
            .await
            .insert(username, sender);
    }

    pub async fn unregister_datagram_outbox(&self, username: &str) {
        self.datagram_outboxes.lock().await.remove(username);
    }

    pub async fn send_to(&self, username: &str, bytes: Vec<u8>) {
        let outboxes = self.datagram_outboxes.lock().await;
        if let Some(sender) = outboxes.get(username) {
            let _ = sender.send(bytes);
        }
    }
}
