//! Read-only views of a room, as sent to clients.

use serde::{Deserialize, Serialize};

use crate::{LogEvent, Phase, RoomId, Username};

/// One roster entry as observers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub username: Username,
    pub score: u32,
    pub is_eliminated: bool,
    pub kick_votes: usize,
    /// Banked turn time in milliseconds. Not live for the player on the
    /// clock; use the room deadline for them.
    pub time_remaining_ms: u64,
    pub is_ready: bool,
}

/// Everything a client needs to render a room.
///
/// `log` holds either the batch produced by the latest action or the
/// whole history, depending on which accessor built the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub players: Vec<PlayerView>,
    pub stem: String,
    pub phase: Phase,
    pub current_player: Option<Username>,
    /// Absolute turn deadline as Unix milliseconds, `None` when no clock
    /// is running.
    pub deadline_ms: Option<u64>,
    /// The player whose move is contested, if any.
    pub last_player: Option<Username>,
    pub round_starter: usize,
    pub log: Vec<LogEvent>,
}

/// Summary of a public room, used in room listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    pub room_id: RoomId,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: Phase,
    pub min_word_length: usize,
    pub elimination_threshold: u32,
}

/// A relayed chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Username,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_without_deadline_serializes_null() {
        let snapshot = RoomSnapshot {
            players: vec![],
            stem: String::new(),
            phase: Phase::WaitingToStart,
            current_player: None,
            deadline_ms: None,
            last_player: None,
            round_starter: 0,
            log: vec![LogEvent::InsufficientPlayers],
        };
        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();

        assert!(json["deadline_ms"].is_null());
        assert_eq!(json["phase"], "waiting_to_start");
        assert_eq!(json["log"][0]["type"], "InsufficientPlayers");
    }

    #[test]
    fn test_player_view_json_format() {
        let view = PlayerView {
            username: "alice".into(),
            score: 2,
            is_eliminated: false,
            kick_votes: 1,
            time_remaining_ms: 30_000,
            is_ready: true,
        };
        let json: serde_json::Value = serde_json::to_value(&view).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["score"], 2);
        assert_eq!(json["time_remaining_ms"], 30_000);
    }
}
