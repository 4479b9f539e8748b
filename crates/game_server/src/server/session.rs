//! Per-connection session state machine.
//!
//! `Connecting -> AwaitingInitialSend -> Active -> Closed`, with `Closed`
//! reachable from every state and terminal. A [`Session`] that is dropped
//! without reaching `Closed` schedules the teardown itself, so a player is
//! released on every exit path of the connection task.

use crate::error::{CommandError, ServerError};
use crate::game::PlayerId;
use crate::messaging::{route_client_message, Update};
use crate::server::ServerContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// WebSocket handshake in progress.
    Connecting,
    /// Handshake done; registering and queuing the snapshot.
    AwaitingInitialSend,
    /// Processing commands.
    Active,
    /// Released. Terminal.
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, AwaitingInitialSend)
                | (AwaitingInitialSend, Active)
                | (Connecting | AwaitingInitialSend | Active, Closed)
        )
    }
}

/// One client's session.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    remote_addr: SocketAddr,
    player_id: Option<PlayerId>,
    context: ServerContext,
}

impl Session {
    pub fn new(remote_addr: SocketAddr, context: ServerContext) -> Self {
        Self {
            state: SessionState::Connecting,
            remote_addr,
            player_id: None,
            context,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    fn transition(&mut self, next: SessionState) -> Result<(), ServerError> {
        if !self.state.can_transition_to(next) {
            return Err(ServerError::Internal(format!(
                "illegal session transition {:?} -> {:?} for {}",
                self.state, next, self.remote_addr
            )));
        }
        debug!("Session {}: {:?} -> {:?}", self.remote_addr, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Marks the WebSocket handshake as complete.
    pub fn handshake_complete(&mut self) -> Result<(), ServerError> {
        self.transition(SessionState::AwaitingInitialSend)
    }

    /// Joins the game and enters `Active`.
    ///
    /// On failure the session is left in `AwaitingInitialSend`; the caller
    /// is expected to [`close`](Self::close) it.
    pub async fn activate(
        &mut self,
        outbound: mpsc::Sender<Message>,
        close_signal: Arc<Notify>,
    ) -> Result<PlayerId, ServerError> {
        if self.state != SessionState::AwaitingInitialSend {
            return Err(ServerError::Internal(format!(
                "cannot activate session in state {:?}",
                self.state
            )));
        }
        let player_id = self
            .context
            .join(self.remote_addr, outbound, close_signal)
            .await?;
        self.player_id = Some(player_id);
        self.transition(SessionState::Active)?;
        Ok(player_id)
    }

    /// Handles one inbound text message.
    ///
    /// Fails with [`CommandError::NotRegistered`] unless the session is
    /// `Active`.
    pub async fn handle_text(&self, text: &str) -> Result<(), CommandError> {
        match (self.state, self.player_id) {
            (SessionState::Active, Some(player_id)) => {
                route_client_message(text, player_id, &self.context).await
            }
            _ => Err(CommandError::NotRegistered),
        }
    }

    /// Sends a `rejected` message to this client only.
    pub async fn reject(&self, error: &CommandError) {
        let Some(player_id) = self.player_id else {
            return;
        };
        debug!("Rejecting message from player {}: {}", player_id, error);
        let update = Update::Rejected(error.to_rejection());
        self.context.broadcaster().send_to(player_id, &update).await;
    }

    /// Enters `Closed` and releases the player. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Some(player_id) = self.player_id {
            self.context.leave(player_id).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        let Some(player_id) = self.player_id else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let context = self.context.clone();
                handle.spawn(async move {
                    context.leave(player_id).await;
                });
            }
            Err(_) => warn!(
                "Session for player {} dropped outside the runtime; player not released",
                player_id
            ),
        }
    }
}
