//! Structured room log records.
//!
//! Every notable occurrence in a room becomes one [`LogEvent`]. The room
//! keeps them in order and never rewrites history, so a late joiner can
//! replay a whole game from the full log while connected clients only
//! receive the batch produced by the latest action.

use serde::{Deserialize, Serialize};

use crate::Username;

/// Which end of the stem a letter was added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Prefix,
    Suffix,
}

/// One record in a room's event log.
///
/// Serialized with an internal `"type"` tag so clients can switch on it:
///
/// ```json
/// {"type": "StemExtended", "player": "alice", "letter": "S", "side": "suffix", "stem": "S"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LogEvent {
    Join {
        player: Username,
    },

    Leave {
        player: Username,
    },

    VoteKick {
        voter: Username,
        target: Username,
    },

    /// The target reached the kick threshold and was removed.
    Kick {
        player: Username,
    },

    /// A letter was added. `stem` is the result, upper-cased.
    StemExtended {
        player: Username,
        letter: char,
        side: Side,
        stem: String,
    },

    ChallengeIsWord {
        challenger: Username,
        challenged: Option<Username>,
    },

    ChallengeContinuation {
        challenger: Username,
        challenged: Username,
    },

    /// The challenged player's proposed completion. `prefix` and
    /// `suffix` are what they added around `stem`.
    Rebuttal {
        player: Username,
        prefix: String,
        stem: String,
        suffix: String,
    },

    /// Outcome of either kind of challenge. `is_word` reports the
    /// oracle's verdict on `word`; `loser` is the penalized player.
    ChallengeResult {
        word: String,
        is_word: bool,
        loser: Option<Username>,
    },

    /// A continuation challenge was made against a player who had
    /// already left. The round ends with no penalty.
    ChallengedPlayerLeft {
        challenger: Username,
        challenged: Username,
    },

    Concession {
        player: Username,
    },

    Elimination {
        player: Username,
    },

    Timeout {
        player: Username,
    },

    InsufficientPlayers,

    GameOver {
        winner: Username,
    },

    GameStart {
        players: Vec<Username>,
    },

    Ready {
        player: Username,
    },
}
