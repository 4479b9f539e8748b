//! Configuration management for the board server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use crate::cli::CliArgs;
use game_server::{BoardConfig, ServerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_max_connections() -> usize {
    1000
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_max_message_size() -> usize {
    64 * 1024
}

fn default_starting_health() -> u32 {
    10
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Board rules
    #[serde(default)]
    pub board: BoardSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, connection limits and per-connection resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Pending outbound messages allowed per connection before it is dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Largest accepted inbound message in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Turn resolution interval in milliseconds (0 disables turn resolution)
    #[serde(default)]
    pub turn_interval_ms: u64,
}

/// Board configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSettings {
    pub width: u32,
    pub height: u32,
    /// Health every new player starts with
    #[serde(default = "default_starting_health")]
    pub starting_health: u32,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        let board = BoardConfig::default();
        Self {
            width: board.width,
            height: board.height,
            starting_health: default_starting_health(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:8080".to_string(),
                max_connections: default_max_connections(),
                outbound_queue_capacity: default_outbound_queue_capacity(),
                max_message_size: default_max_message_size(),
                turn_interval_ms: 0,
            },
            board: BoardSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(width) = args.board_width {
            self.board.width = width;
        }
        if let Some(height) = args.board_height {
            self.board.height = height;
        }
    }

    /// Converts the application configuration to a game server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
            max_message_size: self.server.max_message_size,
            turn_interval_ms: self.server.turn_interval_ms,
            board: BoardConfig {
                width: self.board.width,
                height: self.board.height,
            },
            starting_health: self.board.starting_health,
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        self.to_server_config()
            .map_err(|e| e.to_string())?
            .validate()
            .map_err(|e| e.to_string())?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
