//! Factory functions for creating server instances.

use crate::{config::ServerConfig, server::GameServer};

/// Creates a new game server with default configuration.
///
/// Binds `127.0.0.1:8080` with a 16x16 board once started.
///
/// # Example
///
/// ```rust
/// use game_server::create_server;
///
/// let server = create_server();
/// assert_eq!(server.config().board.width, 16);
/// ```
pub fn create_server() -> GameServer {
    GameServer::new(ServerConfig::default())
}

/// Creates a new game server with custom configuration.
///
/// # Example
///
/// ```rust
/// use game_server::{create_server_with_config, BoardConfig, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "0.0.0.0:9000".parse().unwrap(),
///     board: BoardConfig { width: 8, height: 8 },
///     turn_interval_ms: 500,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config);
/// assert_eq!(server.bind_address().port(), 9000);
/// ```
pub fn create_server_with_config(config: ServerConfig) -> GameServer {
    GameServer::new(config)
}
