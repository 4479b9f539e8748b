//! Core game server implementation.
//!
//! This module contains the main `GameServer` struct: it binds the listener,
//! runs the accept loop, drives the optional turn-resolution tick and
//! coordinates graceful shutdown of every live session.

use crate::{
    config::ServerConfig,
    error::ServerError,
    server::{handlers::handle_connection, ServerContext},
    shutdown::ShutdownState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// How long shutdown waits for sessions to release their players.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The core game server structure.
///
/// `GameServer` owns the shared [`ServerContext`] (registry, store and
/// broadcaster) and the shutdown state every task observes.
///
/// # Architecture
///
/// * **Accept loop**: one task accepting TCP connections, spawning a session
///   task per connection
/// * **Session tasks**: tracked in a `JoinSet` so shutdown can wait for them
/// * **Turn tick**: optional periodic turn resolution
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Shared state handed to every connection
    context: ServerContext,

    /// Used when the server is started without an external shutdown state
    shutdown_state: ShutdownState,
}

impl GameServer {
    /// Creates a new game server with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration parameters for server behavior
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: ServerContext::new(config.clone()),
            config,
            shutdown_state: ShutdownState::new(),
        }
    }

    /// Starts the game server and begins accepting connections.
    ///
    /// Runs until [`shutdown`](Self::shutdown) is called.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown_state(self.shutdown_state.clone())
            .await
    }

    /// Starts the game server with graceful shutdown support.
    ///
    /// Binds the configured address and serves until shutdown is initiated
    /// through `shutdown_state`.
    pub async fn start_with_shutdown_state(
        &self,
        shutdown_state: ShutdownState,
    ) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_state).await
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address))
            })?;
        Ok(listener)
    }

    /// Serves connections from an already bound listener.
    ///
    /// Fails with [`ServerError::Config`] before accepting anything when the
    /// configuration does not pass [`ServerConfig::validate`].
    ///
    /// # Shutdown Sequence
    ///
    /// 1. Stop accepting connections
    /// 2. Every session observes the shutdown, closes its socket and releases
    ///    its player
    /// 3. Wait for the session tasks (bounded by a timeout)
    /// 4. Stop the turn tick and mark shutdown complete
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_state: ShutdownState,
    ) -> Result<(), ServerError> {
        self.config.validate()?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(format!("Listener has no local address: {e}")))?;
        info!("🚀 Board server listening on ws://{}", local_addr);
        info!(
            "🗺️ Board {}x{}, up to {} connections",
            self.config.board.width, self.config.board.height, self.config.max_connections
        );

        let tick = self.start_turn_tick(shutdown_state.clone());
        let mut sessions: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        trace!("Accepted TCP connection from {}", addr);
                        let context = self.context.clone();
                        let shutdown = shutdown_state.clone();
                        sessions.spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, context, shutdown).await {
                                error!("Connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        // Usually transient (e.g. EMFILE); keep serving.
                        error!("Failed to accept connection: {}", e);
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            error!("Session task panicked: {}", e);
                        }
                    }
                }
                _ = shutdown_state.wait() => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
            }
        }
        drop(listener);

        info!("🧹 Closing {} active session(s)...", sessions.len());
        let drained = tokio::time::timeout(SESSION_DRAIN_TIMEOUT, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "⚠️ {} session(s) did not close in time, aborting",
                sessions.len()
            );
            sessions.shutdown().await;
        }

        if let Some(tick) = tick {
            tick.abort();
        }
        shutdown_state.complete_shutdown();
        info!("Server stopped");
        Ok(())
    }

    /// Starts the turn-resolution loop when `turn_interval_ms` is non-zero.
    fn start_turn_tick(&self, shutdown_state: ShutdownState) -> Option<JoinHandle<()>> {
        if self.config.turn_interval_ms == 0 {
            info!("⏸️ Turn tick disabled (interval: 0ms)");
            return None;
        }

        let context = self.context.clone();
        let period = Duration::from_millis(self.config.turn_interval_ms);
        info!("🕒 Turn tick started with interval: {}ms", self.config.turn_interval_ms);

        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            let mut turn: u64 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        turn += 1;
                        let moved = context.resolve_turns().await;
                        if moved > 0 {
                            debug!("Turn {} resolved, {} player(s) moved", turn, moved);
                        }
                    }
                    _ = shutdown_state.wait() => {
                        info!("🕒 Turn tick stopping - shutdown initiated");
                        break;
                    }
                }
            }
        }))
    }

    /// Initiates server shutdown for a server started with [`start`](Self::start).
    pub fn shutdown(&self) {
        self.shutdown_state.initiate_shutdown();
    }

    /// Shared registry, store and broadcaster.
    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }
}
