//! Command-line interface handling for the board server.
//!
//! This module provides command-line argument parsing using the `clap`
//! crate. Every option except the config path overrides a file setting.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for bind address
    pub bind_address: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the board width
    pub board_width: Option<u32>,
    /// Optional override for the board height
    pub board_height: Option<u32>,
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage information on error.
    pub fn parse() -> Self {
        Self::try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            bind_address: matches.get_one::<String>("bind").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            board_width: matches.get_one::<u32>("board-width").copied(),
            board_height: matches.get_one::<u32>("board-height").copied(),
        }
    }
}

fn command() -> Command {
    Command::new("Board Server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Authoritative game-state synchronization server for grid board games")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Bind address (e.g., 127.0.0.1:8080)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("board-width")
                .long("board-width")
                .value_name("CELLS")
                .help("Board width in cells")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("board-height")
                .long("board-height")
                .value_name("CELLS")
                .help("Board height in cells")
                .value_parser(value_parser!(u32)),
        )
}
