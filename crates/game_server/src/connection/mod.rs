//! Connection management for client connections.
//!
//! This module handles the lifecycle bookkeeping of client connections:
//! identity assignment, outbound queue handles and the listing used for
//! broadcast.

pub mod client;
pub mod registry;

pub use client::{ClientConnection, DeliveryError};
pub use registry::ConnectionRegistry;
