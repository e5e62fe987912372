//! Wire protocol for the lobby and game channels.
//!
//! Both channels speak JSON text frames over a persistent connection,
//! one frame per logical message, discriminated by a `type` field.

/// One-frame JSON codec.
pub mod codec;

/// Frame encode/decode error types.
pub mod errors;

/// Closed tagged unions for both channels, both directions.
pub mod messages;
