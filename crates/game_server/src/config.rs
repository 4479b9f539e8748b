//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the board server behavior.

use crate::error::ServerError;
use crate::game::GridPos;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration structure for the game server.
///
/// Contains the network settings, per-connection resource limits and the
/// board rules applied by the game state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Number of pending outbound messages a connection may hold before it
    /// is considered unhealthy and closed
    pub outbound_queue_capacity: usize,

    /// Maximum inbound text message size in bytes
    pub max_message_size: usize,

    /// Turn resolution interval in milliseconds (0 to disable)
    pub turn_interval_ms: u64,

    /// Board dimensions
    pub board: BoardConfig,

    /// Health every new player starts with
    pub starting_health: u32,
}

/// Smallest usable outbound queue: a joining client is sent its snapshot and
/// its own `player_added` back to back.
pub const MIN_OUTBOUND_QUEUE_CAPACITY: usize = 2;

impl ServerConfig {
    /// Checks the limits the server relies on.
    ///
    /// Called by [`GameServer::serve`](crate::server::GameServer::serve)
    /// before the first connection is accepted.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_connections == 0 {
            return Err(ServerError::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        if self.outbound_queue_capacity < MIN_OUTBOUND_QUEUE_CAPACITY {
            return Err(ServerError::Config(format!(
                "outbound_queue_capacity must be at least {MIN_OUTBOUND_QUEUE_CAPACITY}, got {}",
                self.outbound_queue_capacity
            )));
        }
        if self.max_message_size == 0 {
            return Err(ServerError::Config(
                "max_message_size must be greater than 0".to_string(),
            ));
        }

        let max_side = i32::MAX as u32;
        if self.board.width == 0 || self.board.height == 0 {
            return Err(ServerError::Config(
                "board width and height must be greater than 0".to_string(),
            ));
        }
        if self.board.width > max_side || self.board.height > max_side {
            return Err(ServerError::Config(format!(
                "board width and height must not exceed {max_side}"
            )));
        }
        Ok(())
    }
}

/// Dimensions of the playing grid.
///
/// Cells are addressed from `(0, 0)` up to `(width - 1, height - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub width: u32,
    pub height: u32,
}

impl BoardConfig {
    /// Returns whether `pos` addresses a cell on this board.
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Iterates every cell in row-major order starting at `(0, 0)`.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        let width = self.width.min(i32::MAX as u32) as i32;
        let height = self.height.min(i32::MAX as u32) as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| GridPos::new(x, y)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            outbound_queue_capacity: 256,
            max_message_size: 64 * 1024, // 64KB
            turn_interval_ms: 0,
            board: BoardConfig::default(),
            starting_health: 10,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
        }
    }
}
