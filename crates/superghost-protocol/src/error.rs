//! Errors raised while turning frames into messages and back.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A message could not be serialized.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A frame was not valid JSON or did not match any message shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A frame decoded, but carries the wrong kind of payload for its
    /// direction (a server message sent by a client, for example).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
