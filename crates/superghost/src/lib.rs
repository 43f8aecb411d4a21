//! # Superghost
//!
//! A server-authoritative Superghost word-game server.
//!
//! Players take turns adding a letter to either end of a shared stem,
//! trying not to complete a word. The server owns every room: it checks
//! turns, runs the turn clocks, asks a [`WordOracle`](superghost_room::WordOracle)
//! to settle challenges, and pushes fresh state to everyone watching.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use superghost::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SuperghostError> {
//!     let server = SuperghostServerBuilder::new()
//!         .bind("0.0.0.0:8080")
//!         .build(Dictionary::parse("ghost ghoul testing"))
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod listeners;
mod server;

pub use error::SuperghostError;
pub use server::{
    DEFAULT_EVICTION_PERIOD, DEFAULT_IDLE_TIMEOUT, SuperghostServer, SuperghostServerBuilder,
};

/// Everything needed to run a server or write a client in one import.
pub mod prelude {
    pub use crate::{SuperghostError, SuperghostServer, SuperghostServerBuilder};

    pub use superghost_protocol::{
        ChatMessage, ClientRequest, Codec, Credential, Envelope, JsonCodec, LogEvent, Payload,
        Phase, PlayerView, ProtocolError, RoomConfig, RoomId, RoomListEntry, RoomSnapshot,
        ServerMessage, Side, Username,
    };
    pub use superghost_room::{Dictionary, OracleError, Room, RoomError, RoomManager, WordOracle};
    pub use superghost_session::SessionError;
    pub use superghost_transport::TransportError;
}
