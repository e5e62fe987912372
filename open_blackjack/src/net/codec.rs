//! One JSON text frame per logical message, no additional framing.

use serde::{Serialize, de::DeserializeOwned};

use super::errors::{DecodeError, Result};

/// Encode an outbound command as a single text frame.
pub fn encode<T: Serialize>(command: &T) -> Result<String> {
    serde_json::to_string(command).map_err(DecodeError::Encode)
}

/// Decode one inbound frame. Fails on malformed JSON or an unknown
/// `type` tag; callers are expected to log and drop the frame rather
/// than tear down the connection.
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T> {
    serde_json::from_str(frame).map_err(DecodeError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::{GameClientCommand, GameServerMessage, LobbyServerMessage};

    #[test]
    fn test_encode_produces_tagged_frame() {
        let frame = encode(&GameClientCommand::Hit { idx: 2 }).unwrap();
        assert_eq!(frame, r#"{"type":"HIT","idx":2}"#);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let result = decode::<GameServerMessage>("{not json");
        assert!(matches!(result, Err(DecodeError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_missing_tag() {
        let result = decode::<GameServerMessage>(r#"{"idx":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        let result = decode::<LobbyServerMessage>(r#"{"type":"SURRENDER"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_known_lobby_frame() {
        let msg: LobbyServerMessage =
            decode(r#"{"type":"REMOVE_GAME","url":"abc123"}"#).unwrap();
        assert_eq!(
            msg,
            LobbyServerMessage::RemoveGame {
                url: "abc123".into()
            }
        );
    }
}
