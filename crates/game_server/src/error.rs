//! Error types and handling for the game server.
//!
//! Server lifecycle failures, per-command rejections and store validation
//! failures each get their own enum so callers can tell a dead listener
//! apart from a client that sent a bad move.

use crate::game::{GridPos, PlayerId};
use crate::messaging::{Rejection, RejectionKind};

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related and internal server errors
/// to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as illegal session transitions
    #[error("Internal error: {0}")]
    Internal(String),

    /// The connection cap was reached while admitting a client
    #[error("Server full ({0} connections)")]
    ServerFull(usize),

    /// The server configuration cannot be served
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Store-level validation failure. Nothing is mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("player {0} is not registered")]
    UnknownPlayer(PlayerId),

    #[error("destination {pos} is outside the {width}x{height} board")]
    OutOfBounds {
        pos: GridPos,
        width: u32,
        height: u32,
    },
}

/// Why a single inbound message was rejected.
///
/// The connection stays open after any of these.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("{0} frames are not supported")]
    UnsupportedFrame(&'static str),

    #[error("connection has no registered player")]
    NotRegistered,

    #[error(transparent)]
    Move(#[from] MoveError),
}

impl CommandError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            CommandError::Malformed(_)
            | CommandError::TooLarge { .. }
            | CommandError::UnsupportedFrame(_) => RejectionKind::Protocol,
            CommandError::NotRegistered | CommandError::Move(_) => RejectionKind::Validation,
        }
    }

    /// Builds the payload sent back to the originating client.
    pub fn to_rejection(&self) -> Rejection {
        Rejection {
            kind: self.kind(),
            reason: self.to_string(),
        }
    }
}
