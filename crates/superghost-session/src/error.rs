//! Error types for the session layer.

use superghost_protocol::Username;

/// Errors raised while issuing or revoking credentials.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Names must be 1 to 24 ASCII letters or digits.
    #[error("invalid username '{0}': use 1-24 letters or digits")]
    InvalidUsername(Username),

    /// Someone in the room already has this name.
    #[error("username {0} is already taken")]
    UsernameTaken(Username),

    /// No credential was issued for this name.
    #[error("no credential for {0}")]
    NotFound(Username),
}
