//! Internal modules for the blackjack console client.
//!
//! The binary wires these together: `session` owns the WebSocket
//! connections, `commands` parses console input, and `app` runs the
//! dispatcher loop that keeps the table mirror and the screen in sync.

pub mod app;
pub mod commands;
pub mod session;
