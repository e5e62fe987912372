//! Error types for wire frame encoding and decoding.

use thiserror::Error;

/// Errors that can occur while mapping frames to and from the wire.
///
/// A decode failure is non-fatal: the session logs it, drops the frame,
/// and keeps the connection alive.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Failed to encode an outbound command
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// Malformed JSON or an unrecognized `type` tag
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, DecodeError>;
