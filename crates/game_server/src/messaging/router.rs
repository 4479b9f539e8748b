//! Message routing logic for dispatching client commands to the game state.
//!
//! Inbound text is size-checked, parsed into a [`ClientCommand`], applied to
//! the store, and the resulting update is published while the store lock is
//! still held.

use crate::error::CommandError;
use crate::game::PlayerId;
use crate::messaging::ClientCommand;
use crate::server::ServerContext;
use tracing::{debug, trace};

/// Parses one inbound text message.
///
/// # Arguments
///
/// * `text` - The raw message text from the client (expected to be JSON)
/// * `max_message_size` - Largest accepted message in bytes
///
/// # Returns
///
/// The decoded command, or a protocol-level [`CommandError`] when the message
/// is oversized or does not match any known command shape.
pub fn parse_command(text: &str, max_message_size: usize) -> Result<ClientCommand, CommandError> {
    if text.len() > max_message_size {
        return Err(CommandError::TooLarge {
            size: text.len(),
            limit: max_message_size,
        });
    }
    Ok(serde_json::from_str(text)?)
}

/// Routes a raw client message to the game state.
///
/// # Message Flow
///
/// 1. Parse the raw text as a `ClientCommand`
/// 2. Apply it to the store on behalf of `player_id`
/// 3. Publish the resulting update to every registered connection
///
/// Nothing is published when an error is returned.
pub async fn route_client_message(
    text: &str,
    player_id: PlayerId,
    context: &ServerContext,
) -> Result<(), CommandError> {
    let command = parse_command(text, context.config().max_message_size)?;
    trace!("📨 Player {} sent {:?}", player_id, command);

    match command {
        ClientCommand::MoveTo { pos } => {
            context.apply_move(player_id, pos).await?;
            debug!("Player {} queued movement to {}", player_id, pos);
        }
    }
    Ok(())
}
