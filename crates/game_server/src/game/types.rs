//! Core game data: player identity, grid positions, health and queued turns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a player, assigned once at registration and never reused
/// while the server runs.
///
/// Serializes as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Hit points. `current` never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    max: u32,
    current: u32,
}

impl Health {
    pub fn full(max: u32) -> Self {
        Self { max, current: max }
    }
}

/// What a player has queued for the next turn resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlayerTurn {
    pub movement: Option<GridPos>,
}

/// Authoritative per-player state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub pos: GridPos,
    pub health: Health,
    pub pending_turn: Option<PlayerTurn>,
}

impl Player {
    pub fn new(id: PlayerId, pos: GridPos, health: Health) -> Self {
        Self {
            id,
            pos,
            health,
            pending_turn: None,
        }
    }

    /// The queued destination, if any.
    pub fn pending_movement(&self) -> Option<GridPos> {
        self.pending_turn.and_then(|turn| turn.movement)
    }
}
