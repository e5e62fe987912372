//! Table state mirroring - entities and the event-driven state machine.
//!
//! The table's authoritative state lives on the server; this module
//! interprets the stream of typed events into a consistent local mirror
//! and tracks which seat belongs to the local participant.

pub mod entities;
pub mod state_machine;

pub use state_machine::{GameTable, ProtocolError, SessionContext};
