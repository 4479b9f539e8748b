//! The authoritative game state and the rules that mutate it.
//!
//! Every mutating operation returns the [`Update`] that describes it so the
//! caller can publish exactly what was committed. Nothing in here touches
//! the network; synchronization lives in [`super::GameStateStore`].

use super::types::{GridPos, Health, Player, PlayerId, PlayerTurn};
use crate::config::BoardConfig;
use crate::error::MoveError;
use crate::messaging::{Update, WorldState};
use std::collections::{HashMap, HashSet};

/// Mapping from player id to player, plus the board rules.
#[derive(Debug, Clone)]
pub struct GameState {
    players: HashMap<PlayerId, Player>,
    board: BoardConfig,
    starting_health: u32,
}

impl GameState {
    pub fn new(board: BoardConfig, starting_health: u32) -> Self {
        Self {
            players: HashMap::new(),
            board,
            starting_health,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Point-in-time copy of every player, ordered by id.
    pub fn snapshot(&self) -> WorldState {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by_key(|p| p.id);
        WorldState { players }
    }

    /// First free cell in row-major order, or `(0, 0)` if the board is full.
    pub fn spawn_position(&self) -> GridPos {
        let occupied: HashSet<GridPos> = self.players.values().map(|p| p.pos).collect();
        self.board
            .cells()
            .find(|cell| !occupied.contains(cell))
            .unwrap_or(GridPos::new(0, 0))
    }

    /// Adds a player at the next spawn position with full health.
    pub fn add_player(&mut self, id: PlayerId) -> Update {
        let player = Player::new(id, self.spawn_position(), Health::full(self.starting_health));
        self.insert_player(player)
    }

    /// Adds a fully specified player, replacing any previous entry for its id.
    pub fn insert_player(&mut self, player: Player) -> Update {
        self.players.insert(player.id, player.clone());
        Update::PlayerAdded(player)
    }

    /// Removes a player. Unknown ids produce no update.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Update> {
        self.players
            .remove(&id)
            .map(|player| Update::PlayerRemoved { id: player.id })
    }

    /// Queues `destination` as the player's pending movement.
    pub fn apply_move(&mut self, id: PlayerId, destination: GridPos) -> Result<Update, MoveError> {
        if !self.board.contains(destination) {
            return Err(MoveError::OutOfBounds {
                pos: destination,
                width: self.board.width,
                height: self.board.height,
            });
        }
        let player = self
            .players
            .get_mut(&id)
            .ok_or(MoveError::UnknownPlayer(id))?;

        player.pending_turn = Some(PlayerTurn {
            movement: Some(destination),
        });
        Ok(Update::SetMovement {
            id,
            movement: destination,
        })
    }

    /// Commits every pending movement and clears the pending turns.
    ///
    /// Returns one `player_moved` update per player that had a movement
    /// queued, in ascending id order.
    pub fn resolve_turns(&mut self) -> Vec<Update> {
        let mut moved: Vec<(PlayerId, GridPos)> = Vec::new();
        for player in self.players.values_mut() {
            if let Some(turn) = player.pending_turn.take() {
                if let Some(destination) = turn.movement {
                    player.pos = destination;
                    moved.push((player.id, destination));
                }
            }
        }
        moved.sort_by_key(|(id, _)| *id);
        moved
            .into_iter()
            .map(|(id, pos)| Update::PlayerMoved { id, pos })
            .collect()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(BoardConfig::default(), 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_board() -> GameState {
        GameState::new(BoardConfig { width: 2, height: 2 }, 10)
    }

    #[test]
    fn snapshot_of_empty_state_has_no_players() {
        let state = GameState::default();
        assert!(state.snapshot().players.is_empty());
        assert_eq!(
            serde_json::to_string(&state.snapshot()).unwrap(),
            r#"{"players":[]}"#
        );
    }

    #[test]
    fn players_spawn_on_free_cells_in_row_major_order() {
        let mut state = small_board();
        for id in 1..=5 {
            state.add_player(PlayerId(id));
        }
        let positions: Vec<GridPos> = state.snapshot().players.iter().map(|p| p.pos).collect();
        assert_eq!(
            positions,
            vec![
                GridPos::new(0, 0),
                GridPos::new(1, 0),
                GridPos::new(0, 1),
                GridPos::new(1, 1),
                // board full
                GridPos::new(0, 0),
            ]
        );
    }

    #[test]
    fn freed_cells_are_reused() {
        let mut state = small_board();
        state.add_player(PlayerId(1));
        state.add_player(PlayerId(2));
        state.remove_player(PlayerId(1));
        assert_eq!(state.spawn_position(), GridPos::new(0, 0));
    }

    #[test]
    fn add_player_returns_player_added() {
        let mut state = GameState::default();
        let update = state.add_player(PlayerId(1));
        let player = state.player(PlayerId(1)).cloned().unwrap();
        assert_eq!(update, Update::PlayerAdded(player.clone()));
        assert_eq!(player.health, Health::full(10));
        assert_eq!(player.pending_turn, None);
    }

    #[test]
    fn remove_unknown_player_yields_nothing() {
        let mut state = GameState::default();
        state.add_player(PlayerId(1));
        assert_eq!(
            state.remove_player(PlayerId(1)),
            Some(Update::PlayerRemoved { id: PlayerId(1) })
        );
        assert_eq!(state.remove_player(PlayerId(1)), None);
        assert!(state.is_empty());
    }

    #[test]
    fn apply_move_sets_pending_turn() {
        let mut state = GameState::default();
        state.add_player(PlayerId(1));
        let update = state.apply_move(PlayerId(1), GridPos::new(1, 1)).unwrap();
        assert_eq!(
            update,
            Update::SetMovement {
                id: PlayerId(1),
                movement: GridPos::new(1, 1)
            }
        );
        assert_eq!(
            state.player(PlayerId(1)).unwrap().pending_movement(),
            Some(GridPos::new(1, 1))
        );
    }

    #[test]
    fn rejected_moves_do_not_mutate() {
        let mut state = GameState::default();
        state.add_player(PlayerId(1));
        let before = state.snapshot();

        assert_eq!(
            state.apply_move(PlayerId(1), GridPos::new(16, 0)),
            Err(MoveError::OutOfBounds {
                pos: GridPos::new(16, 0),
                width: 16,
                height: 16
            })
        );
        assert!(matches!(
            state.apply_move(PlayerId(1), GridPos::new(-1, 3)),
            Err(MoveError::OutOfBounds { .. })
        ));
        assert_eq!(
            state.apply_move(PlayerId(9), GridPos::new(1, 1)),
            Err(MoveError::UnknownPlayer(PlayerId(9)))
        );
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn resolve_turns_commits_movements_in_id_order() {
        let mut state = GameState::default();
        for id in [3, 1, 2] {
            state.add_player(PlayerId(id));
        }
        state.apply_move(PlayerId(3), GridPos::new(5, 5)).unwrap();
        state.apply_move(PlayerId(1), GridPos::new(4, 4)).unwrap();

        let updates = state.resolve_turns();
        assert_eq!(
            updates,
            vec![
                Update::PlayerMoved {
                    id: PlayerId(1),
                    pos: GridPos::new(4, 4)
                },
                Update::PlayerMoved {
                    id: PlayerId(3),
                    pos: GridPos::new(5, 5)
                },
            ]
        );
        assert_eq!(state.player(PlayerId(1)).unwrap().pos, GridPos::new(4, 4));
        assert_eq!(state.player(PlayerId(1)).unwrap().pending_turn, None);
        assert!(state.resolve_turns().is_empty());
    }
}
