//! Messages exchanged over a client connection.
//!
//! Clients send [`ClientRequest`]s, the server answers with
//! [`ServerMessage`]s. Both travel inside an [`Envelope`] so every frame
//! carries a sequence number and a timestamp.
//!
//! ```text
//! Client                                Server
//!   |-- CreateRoom { config } ----------->|
//!   |<--------- RoomCreated { room_id } --|
//!   |-- Join { room_id, username } ------>|
//!   |<-- Joined { room_id, credential } --|
//!   |<------------ State(snapshot) -------|   (broadcast to the room)
//!   |-- Affix { prefix, suffix } -------->|
//!   |<------------ State(snapshot) -------|
//! ```

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Credential, RoomConfig, RoomId, RoomListEntry, RoomSnapshot, Username};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A request from a client.
///
/// Game actions (`Ready` through `Leave`) apply to the room the
/// connection is bound to via `Join` or `Resume`, using the credential
/// the server issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    CreateRoom {
        #[serde(default)]
        config: RoomConfig,
    },

    ListRooms,

    /// Subscribe to a room's updates without joining it.
    Watch { room_id: RoomId },

    Join { room_id: RoomId, username: Username },

    /// Rebind a new connection to an existing seat.
    Resume {
        room_id: RoomId,
        credential: Credential,
    },

    Ready,

    Affix {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },

    ChallengeIsWord,

    ChallengeContinuation,

    Rebut {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },

    Concede,

    VoteKick { target: Username },

    Leave,

    Chat { content: String },

    /// Ask for a snapshot carrying the whole log.
    FullState,

    GetConfig,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A message from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    RoomCreated { room_id: RoomId },

    RoomList { rooms: Vec<RoomListEntry> },

    /// The connection now holds a seat. Keep `credential` to `Resume`.
    Joined {
        room_id: RoomId,
        credential: Credential,
    },

    State { room_id: RoomId, snapshot: RoomSnapshot },

    Config { room_id: RoomId, config: RoomConfig },

    Chat { room_id: RoomId, message: ChatMessage },

    /// A rejected request. `code` follows HTTP status conventions
    /// (400, 401, 404, 409, 503).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Either direction's message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Payload {
    Request(ClientRequest),
    Server(ServerMessage),
}

/// The outermost frame on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number. Servers echo nothing back; it is for
    /// ordering and debugging only.
    pub seq: u64,

    /// Sender's clock in Unix milliseconds. Clients may omit it.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    pub fn request(seq: u64, request: ClientRequest) -> Self {
        Self {
            seq,
            timestamp: 0,
            payload: Payload::Request(request),
        }
    }

    pub fn server(seq: u64, timestamp: u64, message: ServerMessage) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Server(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_request_json_format() {
        let envelope = Envelope::request(
            1,
            ClientRequest::Join {
                room_id: RoomId(4),
                username: "alice".into(),
            },
        );
        let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["seq"], 1);
        assert_eq!(json["payload"]["kind"], "Request");
        assert_eq!(json["payload"]["data"]["type"], "Join");
        assert_eq!(json["payload"]["data"]["room_id"], 4);
        assert_eq!(json["payload"]["data"]["username"], "alice");
    }

    #[test]
    fn test_affix_missing_side_defaults_to_empty() {
        let json = r#"{"seq":3,"payload":{"kind":"Request","data":{"type":"Affix","suffix":"t"}}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.timestamp, 0);
        assert_eq!(
            envelope.payload,
            Payload::Request(ClientRequest::Affix {
                prefix: String::new(),
                suffix: "t".into(),
            })
        );
    }

    #[test]
    fn test_create_room_without_config_uses_default() {
        let json = r#"{"type":"CreateRoom"}"#;
        let request: ClientRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request,
            ClientRequest::CreateRoom {
                config: RoomConfig::default()
            }
        );
    }

    #[test]
    fn test_error_message_json_format() {
        let msg = ServerMessage::Error {
            code: 409,
            message: "it is not your turn".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 409);
    }

    #[test]
    fn test_unknown_request_type_fails() {
        let json = r#"{"type":"Teleport"}"#;
        assert!(serde_json::from_str::<ClientRequest>(json).is_err());
    }
}
