//! The Superghost room coordinator.
//!
//! A room is a per-game state machine: it keeps the roster and turn
//! order, arbitrates every move against the current phase, runs a turn
//! clock that races with player moves, and records everything in an
//! incrementally readable event log.
//!
//! # Key types
//!
//! - [`Room`]: the synchronized API; one lock per room
//! - [`PlayerManager`]: roster, turn cursors, deadlines, credentials
//! - [`EventLog`]: append-only history with a delivery cursor
//! - [`WordOracle`]: the word-checking collaborator ([`Dictionary`] is
//!   the in-memory one)
//! - [`RoomManager`]: the table of rooms, listing, and idle eviction
//!
//! ```text
//! Facade (above)  ← resolves a room, forwards one request
//!     ↕
//! Room Layer (this crate)  ← game rules, clocks, log
//!     ↕
//! Session / Tick / Protocol (below)  ← credentials, countdowns, types
//! ```

mod error;
mod log;
mod manager;
mod oracle;
mod player;
mod player_manager;
mod room;

pub use error::{ErrorKind, RoomError};
pub use log::EventLog;
pub use manager::RoomManager;
pub use oracle::{Dictionary, OracleError, WordOracle};
pub use player::Player;
pub use player_manager::PlayerManager;
pub use room::{AsyncUpdate, Room, UpdateCause, UpdateSender};
