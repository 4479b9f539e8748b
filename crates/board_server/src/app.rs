//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that starts the board
//! server, reports its status, waits for a termination signal and drives
//! the graceful shutdown.

use crate::{
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, wait_for_signal},
};
use game_server::{GameServer, ShutdownState};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// How often the status report is logged.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on how long the server task may take to stop.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Main application struct.
///
/// # Architecture
///
/// * **Configuration Management**: Validated configuration with CLI overrides applied
/// * **Server Orchestration**: Runs the game server on a background task
/// * **Status Reporting**: Periodic connection and player counts
/// * **Graceful Shutdown**: Handles termination signals and cleanup procedures
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Game server instance
    server: Arc<GameServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Validate the merged configuration
    /// 2. Display startup banner
    /// 3. Initialize the game server with the converted configuration
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration validated successfully");

        display_banner();

        let server_config = config.to_server_config()?;
        let server = Arc::new(GameServer::new(server_config));

        Ok(Self { config, server })
    }

    /// Runs the application until a termination signal is received or the
    /// server stops on its own.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting board server application");
        self.log_configuration_summary();

        let shutdown_state = ShutdownState::new();

        let mut server_handle = {
            let server = self.server.clone();
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move { server.start_with_shutdown_state(shutdown_state).await })
        };

        let status_handle = {
            let server = self.server.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(STATUS_INTERVAL);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    let connections = server.context().registry().len().await;
                    let players = server.context().store().snapshot().await.players.len();
                    info!(
                        "📊 Status - {} connection(s) | {} player(s) on the board",
                        connections, players
                    );
                }
            })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        // Either a signal arrives or the server ends by itself (e.g. bind failure).
        tokio::select! {
            result = &mut server_handle => {
                status_handle.abort();
                return match result {
                    Ok(Ok(())) => {
                        info!("✅ Server completed successfully");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        error!("❌ Server error: {}", e);
                        Err(e.into())
                    }
                    Err(e) => Err(format!("Server task failed: {e}").into()),
                };
            }
            signal = setup_signal_handlers(&shutdown_state) => signal?,
        }

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        status_handle.abort();

        info!("⏳ Waiting for sessions to close...");
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Server task completed gracefully"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => {
                warn!("⏰ Server task did not complete within timeout, aborting");
                server_handle.abort();
            }
        }

        self.log_final_statistics().await;
        info!("✅ Board server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!(
            "  🗺️ Board: {}x{} cells, starting health {}",
            self.config.board.width, self.config.board.height, self.config.board.starting_health
        );
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!(
            "  📬 Outbound queue: {} messages | Max message size: {} bytes",
            self.config.server.outbound_queue_capacity, self.config.server.max_message_size
        );
        if self.config.server.turn_interval_ms > 0 {
            info!("  ⏱️ Turn interval: {}ms", self.config.server.turn_interval_ms);
        } else {
            info!("  ⏱️ Turn resolution disabled");
        }
    }

    async fn log_final_statistics(&self) {
        let context = self.server.context();
        info!("📊 Final Statistics:");
        info!(
            "  - Connections still registered: {}",
            context.registry().len().await
        );
        info!(
            "  - Players still on the board: {}",
            context.store().snapshot().await.players.len()
        );
    }
}
