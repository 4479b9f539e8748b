//! Fan-out of server messages to connected clients.
//!
//! Every payload is serialized once and the resulting text frame is shared
//! between all recipients. Delivery is a non-blocking enqueue on each
//! connection's bounded outbound queue.

use crate::connection::{ClientConnection, ConnectionRegistry, DeliveryError};
use crate::game::PlayerId;
use serde::Serialize;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

/// Pushes messages to registered connections.
///
/// Callers that publish state changes must hold the game state lock while
/// calling [`Broadcaster::publish`] so every queue sees commits in the same
/// order.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Delivers `payload` to every connection registered at the moment of
    /// the call. Returns how many queues accepted it.
    pub async fn publish<T: Serialize + ?Sized>(&self, payload: &T) -> usize {
        let Some(message) = encode(payload) else {
            return 0;
        };

        let connections = self.registry.list_connections().await;
        let delivered = connections
            .iter()
            .filter(|connection| deliver(connection, message.clone()))
            .count();
        trace!(
            "📡 Published to {}/{} connections",
            delivered,
            connections.len()
        );
        delivered
    }

    /// Delivers `payload` to a single connection.
    ///
    /// Returns `false` if the connection is not registered or its queue
    /// refused the message.
    pub async fn send_to<T: Serialize + ?Sized>(&self, player_id: PlayerId, payload: &T) -> bool {
        let Some(connection) = self.registry.get(player_id).await else {
            debug!("Dropping message for unregistered player {}", player_id);
            return false;
        };
        match encode(payload) {
            Some(message) => deliver(&connection, message),
            None => false,
        }
    }
}

fn encode<T: Serialize + ?Sized>(payload: &T) -> Option<Message> {
    match serde_json::to_string(payload) {
        Ok(text) => Some(Message::text(text)),
        Err(e) => {
            error!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}

fn deliver(connection: &ClientConnection, message: Message) -> bool {
    match connection.try_deliver(message) {
        Ok(()) => true,
        Err(DeliveryError::QueueFull) => {
            warn!(
                "⚠️ Outbound queue full for player {}, closing connection",
                connection.player_id
            );
            connection.request_close();
            false
        }
        // Teardown already in flight.
        Err(DeliveryError::Disconnected) => false,
    }
}
