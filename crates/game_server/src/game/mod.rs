//! Authoritative game state.
//!
//! [`GameState`] owns the players and the board rules, [`GameStateStore`]
//! wraps it in the async mutex every writer goes through.

pub mod state;
pub mod store;
pub mod types;

pub use state::GameState;
pub use store::GameStateStore;
pub use types::{GridPos, Health, Player, PlayerId, PlayerTurn};
