//! The credential store: who holds which token.
//!
//! Not thread-safe by itself. It lives inside a room's game state and
//! is only touched under that room's lock.

use std::collections::HashMap;

use rand::Rng;
use superghost_protocol::{Credential, Username};

use crate::SessionError;

/// Bearer tokens for the players of one room, keyed by username.
#[derive(Debug, Default)]
pub struct CredentialStore {
    tokens: HashMap<Username, String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for `username`.
    ///
    /// # Errors
    /// [`SessionError::InvalidUsername`] if the name is not 1-24 ASCII
    /// letters or digits, [`SessionError::UsernameTaken`] if a token was
    /// already issued for it.
    pub fn issue(&mut self, username: &Username) -> Result<Credential, SessionError> {
        if !username.is_valid() {
            return Err(SessionError::InvalidUsername(username.clone()));
        }
        if self.tokens.contains_key(username) {
            return Err(SessionError::UsernameTaken(username.clone()));
        }

        let token = generate_token();
        self.tokens.insert(username.clone(), token.clone());
        tracing::debug!(%username, "credential issued");

        Ok(Credential {
            username: username.clone(),
            token,
        })
    }

    /// Invalidates the token held by `username`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no token was issued for the name.
    pub fn revoke(&mut self, username: &Username) -> Result<(), SessionError> {
        match self.tokens.remove(username) {
            Some(_) => {
                tracing::debug!(%username, "credential revoked");
                Ok(())
            }
            None => Err(SessionError::NotFound(username.clone())),
        }
    }

    /// Returns `true` if `credential` carries the token issued to its
    /// username.
    pub fn verify(&self, credential: &Credential) -> bool {
        self.tokens
            .get(&credential.username)
            .is_some_and(|token| *token == credential.token)
    }

    /// Returns the username of the first presented credential that
    /// verifies.
    pub fn first_valid(&self, presented: &[Credential]) -> Option<Username> {
        presented
            .iter()
            .find(|credential| self.verify(credential))
            .map(|credential| credential.username.clone())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A random 32-character lowercase hex string (128 bits of entropy).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
