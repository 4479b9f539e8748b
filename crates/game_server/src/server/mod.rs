//! Core server implementation and connection handling.
//!
//! This module contains the main game server structure, the shared context
//! handed to connections, the per-connection session state machine and the
//! connection handler that drives it.

pub mod context;
pub mod core;
pub mod handlers;
pub mod session;

pub use context::ServerContext;
pub use core::GameServer;
pub use session::{Session, SessionState};
