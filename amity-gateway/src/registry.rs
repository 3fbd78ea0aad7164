//! Connection Registry
//!
//! One entry per connected user, mapping the user id to the sender half of
//! that connection's outbound queue. Events are addressed to specific
//! recipients looked up by id; users who are offline at emission time are
//! skipped.

use std::collections::HashMap;
use std::sync::RwLock;

use amity_core::protocol::{encode_server_event, OutboundEvent, ServerEvent};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error};

pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, UnboundedSender<Message>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection for a user. A second login replaces the
    /// previous connection; the replaced sender is returned so the caller
    /// can log it.
    pub fn register(
        &self,
        user_id: &str,
        tx: UnboundedSender<Message>,
    ) -> Option<UnboundedSender<Message>> {
        self.connections
            .write()
            .unwrap()
            .insert(user_id.to_string(), tx)
    }

    /// Removes a user's entry, but only if it still belongs to the given
    /// connection — a replaced connection must not evict its replacement.
    pub fn unregister(&self, user_id: &str, tx: &UnboundedSender<Message>) -> bool {
        let mut connections = self.connections.write().unwrap();
        match connections.get(user_id) {
            Some(current) if current.same_channel(tx) => {
                connections.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.read().unwrap().contains_key(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap().len()
    }

    /// Sends an event to one user. Returns false if the user is offline or
    /// the connection is gone.
    pub fn send_to(&self, user_id: &str, event: &ServerEvent) -> bool {
        let text = match encode_server_event(event) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to encode outbound event: {}", e);
                return false;
            }
        };
        let connections = self.connections.read().unwrap();
        match connections.get(user_id) {
            Some(tx) => tx.send(Message::Text(text)).is_ok(),
            None => {
                debug!("recipient {} is offline, event dropped", user_id);
                false
            }
        }
    }

    /// Delivers a batch of addressed events. Returns how many reached a
    /// connected recipient.
    pub fn deliver(&self, events: &[OutboundEvent]) -> usize {
        events
            .iter()
            .filter(|e| self.send_to(&e.recipient, &e.event))
            .count()
    }

    /// Sends an event to every connected user except `sender`. Used for
    /// presence, which concerns all peers.
    pub fn broadcast_except(&self, sender: &str, event: &ServerEvent) -> usize {
        let text = match encode_server_event(event) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to encode outbound event: {}", e);
                return 0;
            }
        };
        let connections = self.connections.read().unwrap();
        connections
            .iter()
            .filter(|(user_id, _)| user_id.as_str() != sender)
            .filter(|(_, tx)| tx.send(Message::Text(text.clone())).is_ok())
            .count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
