//! Client connection representation.
//!
//! A [`ClientConnection`] is the registry's handle on one live socket: the
//! sending half of its bounded outbound queue plus the signal used to ask
//! its session to close.

use crate::game::PlayerId;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;

/// Represents an individual client connection to the server.
///
/// Cloning is cheap; every clone feeds the same outbound queue.
///
/// # Fields
///
/// * `player_id` - The player this connection owns for its lifetime
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was registered
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// The player owned by this connection
    pub player_id: PlayerId,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was registered
    pub connected_at: SystemTime,

    outbound: mpsc::Sender<Message>,
    close_signal: Arc<Notify>,
}

/// Outcome of a non-blocking enqueue that did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The writer is not keeping up; the connection is unhealthy.
    #[error("outbound queue full")]
    QueueFull,

    /// The writer has gone away; teardown is in flight.
    #[error("connection closed")]
    Disconnected,
}

impl ClientConnection {
    /// Creates a handle for a connection whose writer drains `outbound`.
    ///
    /// # Arguments
    ///
    /// * `player_id` - Identity assigned by the registry
    /// * `remote_addr` - The network address of the connecting client
    /// * `outbound` - Sending half of the connection's bounded queue
    /// * `close_signal` - Notified when the server wants the session closed
    pub fn new(
        player_id: PlayerId,
        remote_addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        close_signal: Arc<Notify>,
    ) -> Self {
        Self {
            player_id,
            remote_addr,
            connected_at: SystemTime::now(),
            outbound,
            close_signal,
        }
    }

    /// Enqueues `message` without waiting for queue space.
    pub fn try_deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.outbound.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    /// Asks the owning session to shut down.
    pub fn request_close(&self) {
        // notify_one stores a permit, so a session that is busy awaiting
        // something else still observes the request on its next select.
        self.close_signal.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Message>, Arc<Notify>) {
        let (tx, rx) = mpsc::channel(capacity);
        let notify = Arc::new(Notify::new());
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        (
            ClientConnection::new(PlayerId(1), addr, tx, notify.clone()),
            rx,
            notify,
        )
    }

    #[tokio::test]
    async fn full_queue_is_reported_without_blocking() {
        let (conn, mut rx, _) = connection(1);
        assert_eq!(conn.try_deliver(Message::text("a")), Ok(()));
        assert_eq!(
            conn.try_deliver(Message::text("b")),
            Err(DeliveryError::QueueFull)
        );
        assert_eq!(rx.recv().await, Some(Message::text("a")));
    }

    #[tokio::test]
    async fn dropped_receiver_is_reported_as_disconnected() {
        let (conn, rx, _) = connection(4);
        drop(rx);
        assert_eq!(
            conn.try_deliver(Message::text("a")),
            Err(DeliveryError::Disconnected)
        );
    }

    #[tokio::test]
    async fn close_request_is_remembered() {
        let (conn, _rx, notify) = connection(1);
        conn.request_close();
        // the permit is stored even though nobody was waiting yet
        tokio::time::timeout(std::time::Duration::from_secs(1), notify.notified())
            .await
            .expect("close request lost");
    }
}
