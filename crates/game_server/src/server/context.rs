//! Shared server components and the critical sections that combine them.
//!
//! Every operation here takes the game state lock first and publishes while
//! still holding it. The registry lock is only ever taken after the state
//! lock, never the other way round.

use crate::config::ServerConfig;
use crate::connection::ConnectionRegistry;
use crate::error::{MoveError, ServerError};
use crate::game::{GameState, GameStateStore, GridPos, PlayerId};
use crate::messaging::{Broadcaster, Update};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Handles to everything a connection task needs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ServerContext {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<GameStateStore>,
    broadcaster: Broadcaster,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(GameStateStore::new(GameState::new(
            config.board,
            config.starting_health,
        )));
        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            config: Arc::new(config),
            registry,
            store,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<GameStateStore> {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Admits a connection.
    ///
    /// Within one critical section: registers the connection, queues the
    /// current snapshot to it alone, adds its player and publishes
    /// `player_added` to everyone including the newcomer. The snapshot does
    /// not contain the new player.
    ///
    /// Fails with [`ServerError::ServerFull`] when `max_connections` are
    /// already registered.
    pub async fn join(
        &self,
        remote_addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        close_signal: Arc<Notify>,
    ) -> Result<PlayerId, ServerError> {
        let mut state = self.store.lock().await;
        if self.registry.len().await >= self.config.max_connections {
            return Err(ServerError::ServerFull(self.config.max_connections));
        }

        let player_id = self
            .registry
            .register(remote_addr, outbound, close_signal)
            .await;
        let snapshot = state.snapshot();
        self.broadcaster.send_to(player_id, &snapshot).await;

        let update = state.add_player(player_id);
        self.broadcaster.publish(&update).await;
        info!(
            "👋 Player {} joined ({} players)",
            player_id,
            state.len()
        );
        Ok(player_id)
    }

    /// Releases a connection and its player.
    ///
    /// Idempotent: `player_removed` is published only by the call that
    /// actually removed the player. Returns whether this call did.
    pub async fn leave(&self, player_id: PlayerId) -> bool {
        let mut state = self.store.lock().await;
        self.registry.deregister(player_id).await;
        match state.remove_player(player_id) {
            Some(update) => {
                self.broadcaster.publish(&update).await;
                info!(
                    "👋 Player {} left ({} players)",
                    player_id,
                    state.len()
                );
                true
            }
            None => {
                debug!("Player {} already released", player_id);
                false
            }
        }
    }

    /// Queues a movement for `player_id` and publishes `set_movement`.
    pub async fn apply_move(&self, player_id: PlayerId, destination: GridPos) -> Result<(), MoveError> {
        let mut state = self.store.lock().await;
        let update = state.apply_move(player_id, destination)?;
        self.broadcaster.publish(&update).await;
        Ok(())
    }

    /// Commits every pending movement and publishes one `player_moved` per
    /// moved player. Returns how many players moved.
    pub async fn resolve_turns(&self) -> usize {
        let mut state = self.store.lock().await;
        let updates: Vec<Update> = state.resolve_turns();
        for update in &updates {
            self.broadcaster.publish(update).await;
        }
        updates.len()
    }
}
