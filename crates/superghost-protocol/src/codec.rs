//! Byte-level encoding of protocol messages.
//!
//! The server never touches `serde_json` directly; it goes through a
//! [`Codec`] so the wire format is chosen in one place.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ClientRequest, Envelope, Payload, ProtocolError};

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so one codec can be shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes an envelope and unwraps the client request inside it.
    ///
    /// # Errors
    /// Fails on malformed input, or with `InvalidMessage` when the
    /// envelope carries a server payload.
    fn decode_request(&self, data: &[u8]) -> Result<(u64, ClientRequest), ProtocolError> {
        let envelope: Envelope = self.decode(data)?;
        match envelope.payload {
            Payload::Request(request) => Ok((envelope.seq, request)),
            Payload::Server(_) => Err(ProtocolError::InvalidMessage(
                "clients may only send requests".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. Behind the `json` feature
/// (enabled by default).
///
/// ```rust
/// use superghost_protocol::{ClientRequest, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::request(1, ClientRequest::ListRooms);
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let (seq, request) = codec.decode_request(&bytes).unwrap();
/// assert_eq!(seq, 1);
/// assert_eq!(request, ClientRequest::ListRooms);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::ServerMessage;

    #[test]
    fn test_decode_request_rejects_server_payload() {
        let codec = JsonCodec;
        let envelope = Envelope::server(
            7,
            0,
            ServerMessage::Error {
                code: 400,
                message: "nope".into(),
            },
        );
        let bytes = codec.encode(&envelope).unwrap();

        let result = codec.decode_request(&bytes);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = JsonCodec;
        let result = codec.decode_request(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_request_returns_sequence_number() {
        let codec = JsonCodec;
        let bytes = br#"{"seq":42,"payload":{"kind":"Request","data":{"type":"Concede"}}}"#;
        let (seq, request) = codec.decode_request(bytes).unwrap();
        assert_eq!(seq, 42);
        assert_eq!(request, ClientRequest::Concede);
    }
}
