//! Player credentials for Superghost.
//!
//! Each room owns one [`CredentialStore`]. Joining issues a bearer token
//! bound to the player's name; every later request presents that token
//! back and the store decides who, if anyone, is speaking.
//!
//! ```text
//! Room Layer (above)  ← asks "which player sent this?"
//!     ↕
//! Session Layer (this crate)  ← issues, verifies, revokes tokens
//!     ↕
//! Protocol Layer (below)  ← provides Username, Credential
//! ```

mod error;
mod store;

pub use error::SessionError;
pub use store::CredentialStore;
