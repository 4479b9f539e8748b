//! Message handling and routing for client-server communication.
//!
//! This module provides the wire types, the inbound command router and the
//! broadcaster that fans state changes out to every connection.

pub mod broadcaster;
pub mod router;
pub mod types;

pub use broadcaster::Broadcaster;
pub use router::{parse_command, route_client_message};
pub use types::{ClientCommand, Rejection, RejectionKind, Update, WorldState};
