//! # Game Server - Grid Board State Synchronization
//!
//! A WebSocket server that keeps every connected client in sync with one
//! authoritative board game state. Clients receive a full snapshot on
//! connect, then a stream of updates; they send movement commands back.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Connection Registry** - Assigns player ids and tracks live connections
//! * **Game State Store** - Authoritative players behind a single async mutex
//! * **Session Handler** - Per-connection state machine and read loop
//! * **Broadcaster** - Fans updates out to every connection's bounded queue
//!
//! ### Message Flow
//!
//! 1. Client connects and completes the WebSocket handshake
//! 2. The server registers it, sends `{"players": [...]}` to it alone and
//!    announces the new player to everyone with `player_added`
//! 3. Client sends `{"message": "MoveTo", "pos": {"x": 1, "y": 1}}`
//! 4. The store validates the move and every client receives `set_movement`
//! 5. On disconnect every remaining client receives `player_removed`
//!
//! ```rust
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use game_server::{create_server_with_config, ServerConfig, ShutdownState};
//!
//! let config = ServerConfig {
//!     bind_address: "127.0.0.1:0".parse()?,
//!     ..Default::default()
//! };
//! let server = create_server_with_config(config);
//! let shutdown = ShutdownState::new();
//! shutdown.initiate_shutdown();
//! server.start_with_shutdown_state(shutdown).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering
//!
//! Every state change is published while the store lock is held, so all
//! clients observe updates in the same commit order. A client whose queue
//! fills up is disconnected rather than allowed to stall the others.
//!
//! ## Error Handling
//!
//! * [`ServerError`] - binding, handshake and admission failures
//! * [`CommandError`] - a single rejected client message; the connection
//!   stays open and receives a `rejected` update
//! * [`MoveError`] - store-level validation failures

// Re-export core types and functions for easy access
pub use config::{BoardConfig, ServerConfig};
pub use error::{CommandError, MoveError, ServerError};
pub use game::{GameState, GameStateStore, GridPos, Health, Player, PlayerId, PlayerTurn};
pub use messaging::{ClientCommand, Rejection, RejectionKind, Update, WorldState};
pub use server::{GameServer, ServerContext};
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod messaging;
pub mod server;
pub mod shutdown;
pub mod utils;

#[cfg(test)]
mod tests;
