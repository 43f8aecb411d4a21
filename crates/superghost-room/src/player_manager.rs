//! Roster, turn order, and turn deadlines.
//!
//! The roster is a dense `Vec<Player>` in join order with a
//! username → slot index beside it. Two cursors point into it: the
//! player on the clock, and the player who starts the current round.
//! Removing a player compacts the vector and runs both cursors through
//! [`repair_index`], the only place slot arithmetic happens.
//!
//! `PlayerManager` applies no game rules. Deciding when to advance, when
//! a round ends, or whether an eliminated player may act is the room's
//! job.

use std::collections::HashMap;
use std::time::Duration;

use superghost_protocol::{Credential, Username};
use superghost_session::CredentialStore;
use tokio::time::Instant;

use crate::{Player, RoomError};

/// Ordered roster plus turn cursors. Always mutated under the room lock.
#[derive(Debug, Default)]
pub struct PlayerManager {
    players: Vec<Player>,
    slots: HashMap<Username, usize>,
    current: usize,
    /// Whose move is contested. `None` at the start of a round.
    last_player: Option<Username>,
    round_starter: usize,
    /// `None` when no turn clock is running.
    deadline: Option<Instant>,
    credentials: CredentialStore,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Lookup -------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn usernames(&self) -> Vec<Username> {
        self.players.iter().map(|p| p.username().clone()).collect()
    }

    pub fn contains(&self, username: &Username) -> bool {
        self.slots.contains_key(username)
    }

    pub fn get(&self, username: &Username) -> Option<&Player> {
        self.slots.get(username).map(|&slot| &self.players[slot])
    }

    pub(crate) fn get_mut(&mut self, username: &Username) -> Option<&mut Player> {
        let slot = *self.slots.get(username)?;
        self.players.get_mut(slot)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Player> {
        self.players.get(self.current)
    }

    pub fn current_username(&self) -> Option<&Username> {
        self.current().map(Player::username)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(self.current)
    }

    pub fn last_player(&self) -> Option<&Username> {
        self.last_player.as_ref()
    }

    pub fn round_starter(&self) -> usize {
        self.round_starter
    }

    // -- Membership ---------------------------------------------------------

    /// Appends a player and issues their credential.
    ///
    /// # Errors
    /// `InvalidUsername` or `UsernameTaken`.
    pub fn add(
        &mut self,
        username: Username,
        time_budget: Duration,
    ) -> Result<Credential, RoomError> {
        let credential = self.credentials.issue(&username)?;
        self.slots.insert(username.clone(), self.players.len());
        self.players.push(Player::new(username, time_budget));
        Ok(credential)
    }

    /// Removes a player, revokes their credential, and repairs both
    /// cursors.
    ///
    /// A cursor that pointed at the removed player now points at whoever
    /// took that slot (the next player in order, wrapping). It may be
    /// eliminated; the room re-derives eligibility afterwards.
    ///
    /// # Errors
    /// `PlayerNotFound` if the name is not on the roster.
    pub fn remove(&mut self, username: &Username) -> Result<Player, RoomError> {
        let slot = *self
            .slots
            .get(username)
            .ok_or_else(|| RoomError::PlayerNotFound(username.clone()))?;
        self.credentials.revoke(username)?;
        self.slots.remove(username);

        let removed = self.players.remove(slot);
        for (i, player) in self.players.iter().enumerate().skip(slot) {
            self.slots.insert(player.username().clone(), i);
        }

        let len = self.players.len();
        self.current = repair_index(self.current, slot, len);
        self.round_starter = repair_index(self.round_starter, slot, len);
        if len == 0 {
            self.last_player = None;
            self.deadline = None;
        }
        Ok(removed)
    }

    // -- Turn order ---------------------------------------------------------

    /// First non-eliminated slot after `from`, wrapping. `from` itself is
    /// checked last.
    fn next_eligible(&self, from: usize) -> Option<usize> {
        let len = self.players.len();
        (1..=len)
            .map(|step| (from + step) % len)
            .find(|&slot| !self.players[slot].is_eliminated())
    }

    /// Passes the turn to the next non-eliminated player and records the
    /// departing player as last player. Returns `false` only if nobody is
    /// eligible.
    pub fn advance_current(&mut self) -> bool {
        match self.next_eligible(self.current) {
            Some(next) => {
                self.last_player = self.current_username().cloned();
                self.current = next;
                true
            }
            None => false,
        }
    }

    /// Rotates the round starter to the next non-eliminated player and
    /// clears the last player.
    pub fn advance_round_starter(&mut self) -> bool {
        self.last_player = None;
        match self.next_eligible(self.round_starter) {
            Some(next) => {
                self.round_starter = next;
                true
            }
            None => false,
        }
    }

    /// Hands the turn to the round starter.
    pub fn start_round(&mut self) {
        self.current = self.round_starter;
        self.last_player = None;
    }

    /// Moves the current cursor off an eliminated player without touching
    /// the last player. Returns `false` if nobody is eligible.
    pub fn ensure_current_eligible(&mut self) -> bool {
        let Some(player) = self.current() else {
            return false;
        };
        if !player.is_eliminated() {
            return true;
        }
        match self.next_eligible(self.current) {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    /// Gives the turn to the last player and makes the current player the
    /// new last player. Returns `false` if the last player has left.
    pub fn swap_current_and_last(&mut self) -> bool {
        let Some(&slot) = self.last_player.as_ref().and_then(|name| self.slots.get(name)) else {
            return false;
        };
        self.last_player = self.current_username().cloned();
        self.current = slot;
        true
    }

    pub fn non_eliminated_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_eliminated()).count()
    }

    /// The only non-eliminated player, if exactly one remains.
    pub fn sole_survivor(&self) -> Option<Username> {
        let mut alive = self.players.iter().filter(|p| !p.is_eliminated());
        match (alive.next(), alive.next()) {
            (Some(player), None) => Some(player.username().clone()),
            _ => None,
        }
    }

    // -- Deadlines ----------------------------------------------------------

    /// Starts the current player's clock: deadline = `now` + their banked
    /// time.
    pub fn set_deadline(&mut self, now: Instant) {
        self.deadline = self.current().map(|p| now + p.time_remaining());
    }

    pub fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Banks whatever is left of the current player's clock and clears
    /// the deadline. No-op without a deadline.
    pub fn end_turn(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline.take() {
            let left = deadline.saturating_duration_since(now);
            if let Some(player) = self.current_mut() {
                player.set_time_remaining(left);
            }
        }
    }

    // -- Credentials --------------------------------------------------------

    /// The first presented credential that verifies.
    pub fn first_valid(&self, presented: &[Credential]) -> Option<Username> {
        self.credentials.first_valid(presented)
    }

    /// The first presented credential that verifies and names the
    /// current player.
    pub fn in_turn(&self, presented: &[Credential]) -> Option<Username> {
        let current = self.current_username()?;
        presented
            .iter()
            .find(|c| &c.username == current && self.credentials.verify(c))
            .map(|c| c.username.clone())
    }

    // -- Game reset ---------------------------------------------------------

    /// Clears score, elimination, kick votes and ready flags.
    pub fn reset_scores(&mut self) {
        self.players.iter_mut().for_each(Player::reset_for_new_game);
    }

    pub fn reset_times(&mut self, budget: Duration) {
        for player in &mut self.players {
            player.set_time_remaining(budget);
        }
    }

    pub fn clear_ready(&mut self) {
        for player in &mut self.players {
            player.set_ready(false);
        }
    }

    pub fn all_ready(&self) -> bool {
        self.players.iter().all(Player::is_ready)
    }
}

/// Where a roster cursor should point after the slot `removed` was taken
/// out, leaving `len_after` players.
///
/// Past the removed slot: shift down one. At the removed slot: stay, so
/// it lands on the next player, wrapping to 0 past the end.
pub(crate) fn repair_index(index: usize, removed: usize, len_after: usize) -> usize {
    if len_after == 0 {
        0
    } else if index > removed {
        index - 1
    } else if index == removed && removed >= len_after {
        0
    } else {
        index
    }
}
