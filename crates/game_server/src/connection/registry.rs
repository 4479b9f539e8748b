//! Registry of live client connections.
//!
//! This module provides the central directory of connected clients. It
//! assigns player identities and hands out the connection list the
//! broadcaster fans out to.

use super::client::ClientConnection;
use crate::game::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Central registry for all client connections.
///
/// # Architecture
///
/// * Uses `RwLock<HashMap>` for thread-safe connection storage
/// * Implements atomic player ID generation; ids start at 1 and are never reused
/// * Insertion and removal happen under the write lock, so a listing sees a
///   connection either fully registered or not at all
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Map of player ID to client connection information
    connections: RwLock<HashMap<PlayerId, ClientConnection>>,

    /// Atomic counter for generating unique player IDs
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a connection and returns the player id it now owns.
    ///
    /// # Arguments
    ///
    /// * `remote_addr` - The network address of the connecting client
    /// * `outbound` - Sending half of the connection's bounded queue
    /// * `close_signal` - Notified when the connection must be closed
    pub async fn register(
        &self,
        remote_addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        close_signal: Arc<Notify>,
    ) -> PlayerId {
        let player_id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = ClientConnection::new(player_id, remote_addr, outbound, close_signal);
        self.connections.write().await.insert(player_id, connection);
        info!("🔗 Player {} registered from {}", player_id, remote_addr);
        player_id
    }

    /// Removes a connection. Returns whether it was registered.
    pub async fn deregister(&self, player_id: PlayerId) -> bool {
        let removed = self.connections.write().await.remove(&player_id);
        match removed {
            Some(connection) => {
                let connected_for = connection.connected_at.elapsed().unwrap_or_default();
                info!(
                    "❌ Player {} deregistered ({}, connected for {:.1}s)",
                    player_id,
                    connection.remote_addr,
                    connected_for.as_secs_f64()
                );
                true
            }
            None => {
                debug!("Player {} was already deregistered", player_id);
                false
            }
        }
    }

    /// Snapshot of every registered connection.
    pub async fn list_connections(&self) -> Vec<ClientConnection> {
        self.connections.read().await.values().cloned().collect()
    }

    pub async fn get(&self, player_id: PlayerId) -> Option<ClientConnection> {
        self.connections.read().await.get(&player_id).cloned()
    }

    pub async fn contains(&self, player_id: PlayerId) -> bool {
        self.connections.read().await.contains_key(&player_id)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn register(registry: &ConnectionRegistry) -> (PlayerId, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let id = registry
            .register(addr, tx, Arc::new(Notify::new()))
            .await;
        (id, rx)
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reused() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = register(&registry).await;
        let (second, _rx2) = register(&registry).await;
        assert_eq!(first, PlayerId(1));
        assert_eq!(second, PlayerId(2));

        registry.deregister(first).await;
        let (third, _rx3) = register(&registry).await;
        assert_eq!(third, PlayerId(3));
    }

    #[tokio::test]
    async fn deregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (id, _rx) = register(&registry).await;
        assert!(registry.contains(id).await);
        assert!(registry.deregister(id).await);
        assert!(!registry.deregister(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn listing_reflects_registrations() {
        let registry = ConnectionRegistry::new();
        let (a, _rx1) = register(&registry).await;
        let (b, _rx2) = register(&registry).await;
        registry.deregister(a).await;

        let listed: Vec<PlayerId> = registry
            .list_connections()
            .await
            .into_iter()
            .map(|c| c.player_id)
            .collect();
        assert_eq!(listed, vec![b]);
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(b).await.is_some());
        assert!(registry.get(a).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_registrations_get_distinct_ids() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (tx, _rx) = mpsc::channel(1);
                let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
                registry.register(addr, tx, Arc::new(Notify::new())).await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
        assert_eq!(registry.len().await, 50);
    }
}
