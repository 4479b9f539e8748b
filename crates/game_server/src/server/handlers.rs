//! Connection handling logic for WebSocket clients.
//!
//! This module contains the per-connection task: WebSocket handshake,
//! admission into the game, the inbound read loop and the writer task that
//! drains the connection's outbound queue.

use crate::{
    error::{CommandError, ServerError},
    server::{
        session::Session,
        ServerContext,
    },
    shutdown::ShutdownState,
};
use futures_util::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// How long a writer may keep flushing after a close frame was queued.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Handles a single client connection from establishment to cleanup.
///
/// # Connection Flow
///
/// 1. Perform WebSocket handshake
/// 2. Start the writer task draining the bounded outbound queue
/// 3. Join the game: register, receive the snapshot, announce the player
/// 4. Process inbound messages one at a time
/// 5. Release the player when the socket closes, errors, the outbound queue
///    overflows or the server shuts down
///
/// # Arguments
///
/// * `stream` - The TCP stream for the client connection
/// * `addr` - The remote address of the client
/// * `context` - Shared registry, store and broadcaster
/// * `shutdown` - Server-wide shutdown state
///
/// # Returns
///
/// `Ok(())` if the connection was handled successfully, or a `ServerError`
/// if the handshake or admission failed.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    context: ServerContext,
    shutdown: ShutdownState,
) -> Result<(), ServerError> {
    let mut session = Session::new(addr, context.clone());

    // Perform WebSocket handshake
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;
    session.handshake_complete()?;

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(context.config().outbound_queue_capacity);
    let close_signal = Arc::new(Notify::new());
    let mut writer = tokio::spawn(write_outbound(ws_sender, outbound_rx, addr));

    let player_id = match session
        .activate(outbound_tx.clone(), close_signal.clone())
        .await
    {
        Ok(player_id) => player_id,
        Err(ServerError::ServerFull(limit)) => {
            warn!("🚫 Refusing {}: server full ({} connections)", addr, limit);
            session.close().await;
            let _ = outbound_tx
                .send(close_message(CloseCode::Again, "Server full"))
                .await;
            drop(outbound_tx);
            if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
                writer.abort();
            }
            return Ok(());
        }
        Err(e) => {
            session.close().await;
            writer.abort();
            return Err(e);
        }
    };

    let reason = loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = session.handle_text(text.as_str()).await {
                        session.reject(&e).await;
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    session.reject(&CommandError::UnsupportedFrame("binary")).await;
                }
                Some(Ok(Message::Close(_))) => break DisconnectReason::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error for player {}: {}", player_id, e);
                    break DisconnectReason::TransportError;
                }
                None => break DisconnectReason::ClientClosed,
            },
            _ = close_signal.notified() => break DisconnectReason::Unhealthy,
            _ = shutdown.wait() => break DisconnectReason::ServerShutdown,
        }
    };

    info!("🔌 Player {} disconnecting: {:?}", player_id, reason);
    session.close().await;

    if reason == DisconnectReason::ServerShutdown {
        let _ = outbound_tx.try_send(close_message(CloseCode::Away, "Server shutting down"));
        drop(outbound_tx);
        let _ = tokio::time::timeout(CLOSE_GRACE, &mut writer).await;
    }
    writer.abort();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisconnectReason {
    ClientClosed,
    TransportError,
    Unhealthy,
    ServerShutdown,
}

/// Drains the outbound queue into the socket until the queue closes, a close
/// frame has been written or the socket fails.
async fn write_outbound(mut sink: WsSink, mut outbound: mpsc::Receiver<Message>, addr: SocketAddr) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            debug!("Failed to send to {}: {}", addr, e);
            return;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

fn close_message(code: CloseCode, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_owned().into(),
    }))
}
