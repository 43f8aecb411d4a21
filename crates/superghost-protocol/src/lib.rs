//! Wire protocol for Superghost.
//!
//! The "language" clients and the server speak, and the read-only
//! shapes a room exposes:
//!
//! - **Types** ([`RoomId`], [`Username`], [`Credential`], [`RoomConfig`],
//!   [`Phase`]) name rooms, players and settings.
//! - **Events** ([`LogEvent`]) are the records of a room's log.
//! - **Snapshots** ([`RoomSnapshot`], [`PlayerView`], [`RoomListEntry`])
//!   are what observers render.
//! - **Messages** ([`ClientRequest`], [`ServerMessage`], [`Envelope`])
//!   travel on the wire, encoded by a [`Codec`].
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room (game rules)
//! ```

mod codec;
mod error;
mod event;
mod message;
mod snapshot;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{LogEvent, Side};
pub use message::{ClientRequest, Envelope, Payload, ServerMessage};
pub use snapshot::{ChatMessage, PlayerView, RoomListEntry, RoomSnapshot};
pub use types::{Credential, Phase, RoomConfig, RoomId, Username};
