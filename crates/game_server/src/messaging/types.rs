//! Message type definitions for client-server communication.
//!
//! Server-to-client messages are either a [`WorldState`] snapshot (sent once,
//! first, on connect) or an [`Update`]. Client-to-server messages are
//! [`ClientCommand`]s.

use crate::game::{GridPos, Player, PlayerId};
use serde::{Deserialize, Serialize};

/// Full snapshot of the game, players ordered by id.
///
/// ```json
/// { "players": [ { "id": 1, "pos": {"x": 0, "y": 0}, "health": {"max": 10, "current": 10}, "pending_turn": null } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldState {
    pub players: Vec<Player>,
}

/// A single state change pushed to clients.
///
/// Encoded as `{"type": <snake_case tag>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Update {
    /// A player joined; carries the full player.
    PlayerAdded(Player),

    /// A player queued a movement for the next turn.
    SetMovement { id: PlayerId, movement: GridPos },

    /// A player's connection closed.
    PlayerRemoved { id: PlayerId },

    /// A queued movement was committed by turn resolution.
    PlayerMoved { id: PlayerId, pos: GridPos },

    /// Sent only to the client whose message was refused.
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The message could not be understood.
    Protocol,
    /// The message was understood but breaks a game rule.
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub reason: String,
}

/// A command sent from a client to the server.
///
/// # Examples
///
/// ```json
/// { "message": "MoveTo", "pos": { "x": 1, "y": 1 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "message")]
pub enum ClientCommand {
    MoveTo { pos: GridPos },
}
