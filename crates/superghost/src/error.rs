//! Unified error type for the Superghost server.

use superghost_protocol::ProtocolError;
use superghost_room::RoomError;
use superghost_session::SessionError;
use superghost_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SuperghostError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),
}

impl SuperghostError {
    /// HTTP-style status for reporting this error to a client.
    pub fn code(&self) -> u16 {
        match self {
            Self::Room(err) => err.code(),
            Self::Session(_) | Self::Protocol(_) => 400,
            Self::Transport(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superghost_protocol::{RoomId, Username};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: SuperghostError = err.into();
        assert!(matches!(err, SuperghostError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let err: SuperghostError = err.into();
        assert!(matches!(err, SuperghostError::Protocol(_)));
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::UsernameTaken(Username::from("alice"));
        let err: SuperghostError = err.into();
        assert!(matches!(err, SuperghostError::Session(_)));
    }

    #[test]
    fn test_room_error_keeps_its_code() {
        let err: SuperghostError = RoomError::RoomNotFound(RoomId(1)).into();
        assert!(matches!(err, SuperghostError::Room(_)));
        assert_eq!(err.code(), 404);
        assert_eq!(err.to_string(), "room R-1 not found");
    }
}
