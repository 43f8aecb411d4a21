//! Error types for the room layer.

use superghost_protocol::{Phase, RoomId, Username};
use superghost_session::SessionError;

use crate::OracleError;

/// Broad classes of rejection, used to pick a status code and to tell
/// callers whether retrying can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No valid credential, or not the caller's turn.
    Authorization,
    /// The action is not allowed in the current phase.
    Phase,
    /// Malformed or disallowed input.
    Validation,
    /// The word oracle failed. Nothing changed; try again.
    Dependency,
    /// Unknown room or player.
    NotFound,
}

/// Errors returned by room operations.
///
/// Every error leaves the room exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("no valid credentials provided")]
    Unauthorized,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("cannot {action} while the room is in {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    #[error("exactly one letter must be added, as a prefix or as a suffix")]
    InvalidAffix,

    #[error("a rebuttal must add at least one letter and use letters only")]
    InvalidRebuttal,

    #[error("minimum word length of {0} not met")]
    TooShort(usize),

    #[error("the stem is empty")]
    EmptyStem,

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("invalid username '{0}': use 1-24 letters or digits")]
    InvalidUsername(Username),

    #[error("username {0} is already taken")]
    UsernameTaken(Username),

    #[error("{voter} already voted to kick {target}")]
    AlreadyVoted { voter: Username, target: Username },

    #[error("{0} is already scheduled to leave")]
    LeaveAlreadyScheduled(Username),

    #[error("{0} is already ready")]
    AlreadyReady(Username),

    #[error("at least two players are needed")]
    NotEnoughPlayers,

    #[error("empty message")]
    EmptyMessage,

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("player {0} not found")]
    PlayerNotFound(Username),

    #[error("word service unavailable, try again: {0}")]
    OracleUnavailable(#[from] OracleError),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized | Self::NotYourTurn => ErrorKind::Authorization,
            Self::WrongPhase { .. } => ErrorKind::Phase,
            Self::InvalidAffix
            | Self::InvalidRebuttal
            | Self::TooShort(_)
            | Self::EmptyStem
            | Self::RoomFull(_)
            | Self::InvalidUsername(_)
            | Self::UsernameTaken(_)
            | Self::AlreadyVoted { .. }
            | Self::LeaveAlreadyScheduled(_)
            | Self::AlreadyReady(_)
            | Self::NotEnoughPlayers
            | Self::EmptyMessage => ErrorKind::Validation,
            Self::OracleUnavailable(_) => ErrorKind::Dependency,
            Self::RoomNotFound(_) | Self::PlayerNotFound(_) => ErrorKind::NotFound,
        }
    }

    /// HTTP-style status code for
    /// [`ServerMessage::Error`](superghost_protocol::ServerMessage::Error).
    pub fn code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Authorization => 401,
            ErrorKind::Phase => 409,
            ErrorKind::Validation => 400,
            ErrorKind::Dependency => 503,
            ErrorKind::NotFound => 404,
        }
    }
}

impl From<SessionError> for RoomError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidUsername(name) => Self::InvalidUsername(name),
            SessionError::UsernameTaken(name) => Self::UsernameTaken(name),
            SessionError::NotFound(name) => Self::PlayerNotFound(name),
        }
    }
}
