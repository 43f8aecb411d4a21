//! Identity, configuration, and phase types shared by every layer.
//!
//! These are the values that name things in a Superghost room: which
//! room, which player, which credential proves who a player is, how the
//! room was configured, and which phase of a round it is in.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room.
///
/// Newtype over `u64` so a room id can never be confused with a score or
/// a count. `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A player's name inside a room. Unique per room, immutable once a
/// player has joined.
///
/// Deserialization does not validate; [`Username::is_valid`] is checked
/// when a player is added to a roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Longest accepted name, in bytes.
    pub const MAX_LEN: usize = 24;

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Non-empty, ASCII alphanumeric, at most [`Self::MAX_LEN`] bytes.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= Self::MAX_LEN
            && self.0.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A bearer credential: the player's name plus the secret token the
/// server issued when they joined.
///
/// Clients present one or more of these with every mutating request;
/// the room picks the first one that validates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    pub username: Username,
    pub token: String,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room is in its round cycle.
///
/// ```text
/// WaitingToStart ──(2+ players, ready)──→ Edit ⇄ Rebut
///        ↑                                  │
///        └────────(game over / <2 players)──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fewer than two players, or the ready gate has not been passed.
    WaitingToStart,
    /// The stem may be extended or challenged.
    Edit,
    /// A continuation challenge is open; the challenged player must
    /// extend the stem into a word.
    Rebut,
}

impl Phase {
    /// Returns `true` while a round is being played.
    pub fn is_in_round(&self) -> bool {
        matches!(self, Self::Edit | Self::Rebut)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingToStart => write!(f, "waiting to start"),
            Self::Edit => write!(f, "edit"),
            Self::Rebut => write!(f, "rebut"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings chosen when a room is created. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Player capacity.
    pub max_players: usize,

    /// Shortest stem that may be claimed to be a word, and shortest
    /// accepted rebuttal.
    pub min_word_length: usize,

    /// Whether the room shows up in room listings.
    pub is_public: bool,

    /// Score at which a player is eliminated from the current game.
    /// 0 disables elimination.
    pub elimination_threshold: u32,

    /// Whether a word already won with this game may be won again.
    pub allow_repeat_words: bool,

    /// Per-round time budget for each player. Zero disables the clock.
    pub time_per_turn: Duration,

    /// Whether each round waits for every player to declare ready.
    pub pause_at_round_start: bool,

    /// Grace period before a scheduled leave takes effect.
    pub leave_grace: Duration,

    /// Fraction of the roster whose votes remove a player.
    pub kick_ratio: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            min_word_length: 5,
            is_public: true,
            elimination_threshold: 0,
            allow_repeat_words: false,
            time_per_turn: Duration::from_secs(60),
            pause_at_round_start: false,
            leave_grace: Duration::from_millis(500),
            kick_ratio: 1.0 / 1.9,
        }
    }
}

impl RoomConfig {
    /// Largest accepted capacity.
    pub const MAX_PLAYERS: usize = 16;

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `max_players` to `2..=MAX_PLAYERS`
    /// - `min_word_length` to at least 1
    /// - `kick_ratio` to `(0, 1]`, falling back to the default when not finite
    pub fn validated(mut self) -> Self {
        self.max_players = self.max_players.clamp(2, Self::MAX_PLAYERS);
        self.min_word_length = self.min_word_length.max(1);
        if !self.kick_ratio.is_finite() || self.kick_ratio <= 0.0 {
            self.kick_ratio = Self::default().kick_ratio;
        }
        self.kick_ratio = self.kick_ratio.min(1.0);
        self
    }

    /// Returns `true` when turns are timed.
    pub fn is_timed(&self) -> bool {
        !self.time_per_turn.is_zero()
    }
}
