//! Serialized access to the game state.

use super::state::GameState;
use crate::messaging::WorldState;
use tokio::sync::{Mutex, MutexGuard};

/// The single serialization point for game state.
///
/// Writers hold the guard returned by [`GameStateStore::lock`] for the whole
/// mutate-and-publish step, which makes commit order and broadcast order
/// identical on every connection.
#[derive(Debug, Default)]
pub struct GameStateStore {
    state: Mutex<GameState>,
}

impl GameStateStore {
    pub fn new(state: GameState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Acquires exclusive access to the state.
    pub async fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().await
    }

    /// Consistent point-in-time copy of the state.
    pub async fn snapshot(&self) -> WorldState {
        self.state.lock().await.snapshot()
    }
}
