//! A single participant's record.

use std::collections::HashSet;
use std::time::Duration;

use superghost_protocol::{PlayerView, Username};

/// One seat in a room.
///
/// Score and elimination are per game; [`Player::reset_for_new_game`]
/// clears them along with kick votes and the ready flag.
#[derive(Debug, Clone)]
pub struct Player {
    username: Username,
    score: u32,
    is_eliminated: bool,
    /// Banked turn time. Stale while this player is on the clock.
    time_remaining: Duration,
    kick_voters: HashSet<Username>,
    is_ready: bool,
}

impl Player {
    pub fn new(username: Username, time_budget: Duration) -> Self {
        Self {
            username,
            score: 0,
            is_eliminated: false,
            time_remaining: time_budget,
            kick_voters: HashSet::new(),
            is_ready: false,
        }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_eliminated(&self) -> bool {
        self.is_eliminated
    }

    pub fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    pub fn kick_votes(&self) -> usize {
        self.kick_voters.len()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    /// Adds one penalty point. Returns `true` if this point eliminated
    /// the player. A `threshold` of 0 never eliminates.
    pub(crate) fn add_point(&mut self, threshold: u32) -> bool {
        self.score += 1;
        if threshold > 0 && self.score >= threshold && !self.is_eliminated {
            self.is_eliminated = true;
            return true;
        }
        false
    }

    /// Records a kick vote. Returns `false` if `voter` already voted.
    pub(crate) fn add_kick_vote(&mut self, voter: Username) -> bool {
        self.kick_voters.insert(voter)
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.is_ready = ready;
    }

    pub(crate) fn set_time_remaining(&mut self, time: Duration) {
        self.time_remaining = time;
    }

    pub(crate) fn reset_for_new_game(&mut self) {
        self.score = 0;
        self.is_eliminated = false;
        self.kick_voters.clear();
        self.is_ready = false;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            username: self.username.clone(),
            score: self.score,
            is_eliminated: self.is_eliminated,
            kick_votes: self.kick_votes(),
            time_remaining_ms: self.time_remaining.as_millis() as u64,
            is_ready: self.is_ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new("alice".into(), Duration::from_secs(60))
    }

    #[test]
    fn test_add_point_without_threshold_never_eliminates() {
        let mut p = player();
        for _ in 0..10 {
            assert!(!p.add_point(0));
        }
        assert_eq!(p.score(), 10);
        assert!(!p.is_eliminated());
    }

    #[test]
    fn test_add_point_eliminates_once_at_threshold() {
        let mut p = player();
        assert!(!p.add_point(2));
        assert!(p.add_point(2), "second point reaches the threshold");
        assert!(p.is_eliminated());
        assert!(!p.add_point(2), "elimination is reported once");
    }

    #[test]
    fn test_kick_votes_are_distinct() {
        let mut p = player();
        assert!(p.add_kick_vote("bob".into()));
        assert!(!p.add_kick_vote("bob".into()));
        assert!(p.add_kick_vote("alice".into()), "self-votes count");
        assert_eq!(p.kick_votes(), 2);
    }

    #[test]
    fn test_reset_for_new_game_keeps_identity_and_time() {
        let mut p = player();
        p.add_point(1);
        p.add_kick_vote("bob".into());
        p.set_ready(true);
        p.set_time_remaining(Duration::from_secs(12));

        p.reset_for_new_game();
        assert_eq!(p.score(), 0);
        assert!(!p.is_eliminated());
        assert_eq!(p.kick_votes(), 0);
        assert!(!p.is_ready());
        assert_eq!(p.username().as_str(), "alice");
        assert_eq!(p.time_remaining(), Duration::from_secs(12));
    }

    #[test]
    fn test_view_reports_milliseconds() {
        let mut p = player();
        p.set_time_remaining(Duration::from_millis(1500));
        let view = p.view();
        assert_eq!(view.time_remaining_ms, 1500);
        assert_eq!(view.username.as_str(), "alice");
    }
}
