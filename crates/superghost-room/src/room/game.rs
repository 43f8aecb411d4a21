//! The unsynchronized game core.
//!
//! Everything in here assumes the caller holds the room lock. Only the
//! parent module can reach it; [`Room`](super::Room) is the public face.
//!
//! Two rules carry most of the weight:
//!
//! - Validate first, mutate second. Every guard, and the oracle call,
//!   runs before the log is flushed or anything else changes, so a
//!   rejected action leaves no trace.
//! - Disarm before transition. Any path that ends a turn or a round
//!   cancels the turn clock and bumps `turn_epoch` first, so a clock
//!   that already fired and is waiting for the lock finds a stale epoch
//!   and does nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Weak;
use std::time::{SystemTime, UNIX_EPOCH};

use superghost_protocol::{
    ChatMessage, Credential, LogEvent, Phase, RoomConfig, RoomId, RoomListEntry, RoomSnapshot,
    Side, Username,
};
use superghost_tick::Countdown;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::Shared;
use crate::{EventLog, Player, PlayerManager, RoomError, WordOracle};

/// A leave waiting out its grace period. `ticket` tells a firing
/// countdown apart from a newer request by the same player.
struct PendingLeave {
    ticket: u64,
    countdown: Countdown,
}

pub(super) struct Game<O: WordOracle> {
    shared: Weak<Shared<O>>,
    room_id: RoomId,
    config: RoomConfig,
    players: PlayerManager,
    log: EventLog,
    /// Upper-case.
    stem: String,
    phase: Phase,
    /// Words won this game. Stays empty when repeats are allowed.
    used_words: HashSet<String>,
    /// Set once `GameStart` is logged, cleared at game over.
    game_started: bool,
    last_touch: Instant,
    clock: Option<Countdown>,
    turn_epoch: u64,
    pending_leaves: HashMap<Username, PendingLeave>,
    next_ticket: u64,
}

impl<O: WordOracle> Game<O> {
    pub(super) fn new(shared: Weak<Shared<O>>, room_id: RoomId, config: RoomConfig) -> Self {
        Self {
            shared,
            room_id,
            config,
            players: PlayerManager::new(),
            log: EventLog::new(),
            stem: String::new(),
            phase: Phase::WaitingToStart,
            used_words: HashSet::new(),
            game_started: false,
            last_touch: Instant::now(),
            clock: None,
            turn_epoch: 0,
            pending_leaves: HashMap::new(),
            next_ticket: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    pub(super) fn authenticate(&self, credentials: &[Credential]) -> Result<Username, RoomError> {
        self.players
            .first_valid(credentials)
            .ok_or(RoomError::Unauthorized)
    }

    fn require_turn(&self, credentials: &[Credential]) -> Result<Username, RoomError> {
        match self.players.in_turn(credentials) {
            Some(username) => Ok(username),
            None if self.players.first_valid(credentials).is_some() => Err(RoomError::NotYourTurn),
            None => Err(RoomError::Unauthorized),
        }
    }

    fn require_phase(&self, expected: Phase, action: &'static str) -> Result<(), RoomError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RoomError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn touch(&mut self) {
        self.last_touch = Instant::now();
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    pub(super) fn join(&mut self, username: Username) -> Result<Credential, RoomError> {
        self.touch();
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.room_id));
        }
        let credential = self.players.add(username.clone(), self.config.time_per_turn)?;

        self.log.flush();
        self.log.push(LogEvent::Join {
            player: username.clone(),
        });
        info!(room_id = %self.room_id, %username, players = self.players.len(), "player joined");

        if self.phase == Phase::WaitingToStart
            && !self.config.pause_at_round_start
            && self.players.len() >= 2
        {
            self.leave_waiting();
        }
        Ok(credential)
    }

    pub(super) fn ready(&mut self, credentials: &[Credential]) -> Result<(), RoomError> {
        self.touch();
        let username = self.authenticate(credentials)?;
        self.require_phase(Phase::WaitingToStart, "ready up")?;
        if self.players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        let Some(player) = self.players.get_mut(&username) else {
            return Err(RoomError::PlayerNotFound(username));
        };
        if player.is_ready() {
            return Err(RoomError::AlreadyReady(username));
        }
        player.set_ready(true);

        self.log.flush();
        self.log.push(LogEvent::Ready { player: username });
        if self.players.all_ready() {
            self.leave_waiting();
        }
        Ok(())
    }

    /// WaitingToStart → Edit. Logs `GameStart` if no game is under way.
    fn leave_waiting(&mut self) {
        self.players.clear_ready();
        if !self.game_started {
            self.game_started = true;
            self.players.start_round();
            self.log.push(LogEvent::GameStart {
                players: self.players.usernames(),
            });
            info!(room_id = %self.room_id, players = self.players.len(), "game started");
        }
        self.phase = Phase::Edit;
    }

    pub(super) fn leave(&mut self, credentials: &[Credential]) -> Result<(), RoomError> {
        self.touch();
        let username = self.authenticate(credentials)?;

        self.log.flush();
        self.log.push(LogEvent::Leave {
            player: username.clone(),
        });
        self.remove_player(&username)
    }

    pub(super) fn vote_kick(
        &mut self,
        credentials: &[Credential],
        target: Username,
    ) -> Result<(), RoomError> {
        self.touch();
        let voter = self.authenticate(credentials)?;
        let roster_len = self.players.len() as f64;
        let Some(player) = self.players.get_mut(&target) else {
            return Err(RoomError::PlayerNotFound(target));
        };
        if !player.add_kick_vote(voter.clone()) {
            return Err(RoomError::AlreadyVoted { voter, target });
        }
        let votes = player.kick_votes();

        self.log.flush();
        self.log.push(LogEvent::VoteKick {
            voter,
            target: target.clone(),
        });
        if votes as f64 >= roster_len * self.config.kick_ratio {
            info!(room_id = %self.room_id, %target, votes, "player kicked");
            self.log.push(LogEvent::Kick {
                player: target.clone(),
            });
            self.remove_player(&target)?;
        }
        Ok(())
    }

    /// Takes a player out of the room. The caller logs why first.
    ///
    /// Ends the round if the game can no longer continue or a contested
    /// party left mid-rebuttal. If the player on the clock left during
    /// Edit, the turn passes straight on, with a fresh clock if one was
    /// running.
    fn remove_player(&mut self, username: &Username) -> Result<(), RoomError> {
        if let Some(pending) = self.pending_leaves.remove(username) {
            pending.countdown.cancel();
        }
        let was_current = self.players.current_username() == Some(username);
        let contested = self.phase == Phase::Rebut
            && (was_current || self.players.last_player() == Some(username));
        let clock_was_running = self.clock.is_some();
        if was_current {
            self.end_turn();
        }

        self.players.remove(username)?;
        info!(room_id = %self.room_id, %username, players = self.players.len(), "player removed");

        let game_cannot_continue =
            self.players.len() < 2 || self.players.non_eliminated_count() < 2;
        if !self.phase.is_in_round() {
            // Paused at the ready gate between rounds of a running game.
            if self.game_started && game_cannot_continue {
                self.end_round();
            } else if self.players.len() >= 2 && self.players.all_ready() {
                self.leave_waiting();
            }
            return Ok(());
        }

        if game_cannot_continue || contested {
            self.end_round();
        } else if was_current {
            self.players.ensure_current_eligible();
            if clock_was_running {
                self.arm_clock();
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    pub(super) fn affix(
        &mut self,
        credentials: &[Credential],
        prefix: &str,
        suffix: &str,
    ) -> Result<(), RoomError> {
        self.touch();
        self.authenticate(credentials)?;
        self.require_phase(Phase::Edit, "affix")?;
        let player = self.require_turn(credentials)?;
        let (letter, side) = parse_affix(prefix, suffix)?;

        self.end_turn();
        self.log.flush();
        match side {
            Side::Prefix => self.stem.insert(0, letter),
            Side::Suffix => self.stem.push(letter),
        }
        self.log.push(LogEvent::StemExtended {
            player,
            letter,
            side,
            stem: self.stem.clone(),
        });

        if !self.players.advance_current() {
            warn!(room_id = %self.room_id, "no eligible player to pass the turn to");
        }
        self.arm_clock();
        Ok(())
    }

    pub(super) async fn challenge_is_word(
        &mut self,
        oracle: &O,
        credentials: &[Credential],
    ) -> Result<(), RoomError> {
        self.touch();
        self.authenticate(credentials)?;
        self.require_phase(Phase::Edit, "challenge")?;
        let challenger = self.require_turn(credentials)?;
        if self.stem.len() < self.config.min_word_length {
            return Err(RoomError::TooShort(self.config.min_word_length));
        }

        let is_word = oracle.is_word(&self.stem, &self.used_words).await?;

        self.end_turn();
        self.log.flush();
        let challenged = self.players.last_player().cloned();
        self.log.push(LogEvent::ChallengeIsWord {
            challenger: challenger.clone(),
            challenged: challenged.clone(),
        });
        let loser = if is_word {
            self.record_used(self.stem.clone());
            challenged
        } else {
            Some(challenger)
        };
        self.log.push(LogEvent::ChallengeResult {
            word: self.stem.clone(),
            is_word,
            loser: loser.clone(),
        });
        if let Some(loser) = loser {
            self.penalize(&loser);
        }
        self.end_round();
        Ok(())
    }

    pub(super) fn challenge_continuation(
        &mut self,
        credentials: &[Credential],
    ) -> Result<(), RoomError> {
        self.touch();
        self.authenticate(credentials)?;
        self.require_phase(Phase::Edit, "challenge")?;
        let challenger = self.require_turn(credentials)?;
        if self.stem.is_empty() {
            return Err(RoomError::EmptyStem);
        }
        let challenged = self
            .players
            .last_player()
            .cloned()
            .ok_or(RoomError::EmptyStem)?;

        self.end_turn();
        self.log.flush();
        if !self.players.swap_current_and_last() {
            self.log.push(LogEvent::ChallengedPlayerLeft {
                challenger,
                challenged,
            });
            self.end_round();
            return Ok(());
        }
        self.log.push(LogEvent::ChallengeContinuation {
            challenger,
            challenged,
        });
        self.phase = Phase::Rebut;
        self.arm_clock();
        Ok(())
    }

    pub(super) async fn rebut(
        &mut self,
        oracle: &O,
        credentials: &[Credential],
        prefix: &str,
        suffix: &str,
    ) -> Result<(), RoomError> {
        self.touch();
        self.authenticate(credentials)?;
        self.require_phase(Phase::Rebut, "rebut")?;
        let player = self.require_turn(credentials)?;
        let letters_only = prefix.bytes().chain(suffix.bytes()).all(|b| b.is_ascii_alphabetic());
        if (prefix.is_empty() && suffix.is_empty()) || !letters_only {
            return Err(RoomError::InvalidRebuttal);
        }
        let prefix = prefix.to_ascii_uppercase();
        let suffix = suffix.to_ascii_uppercase();
        let candidate = format!("{prefix}{}{suffix}", self.stem);
        if candidate.len() < self.config.min_word_length {
            return Err(RoomError::TooShort(self.config.min_word_length));
        }

        let is_word = oracle.is_word(&candidate, &self.used_words).await?;
        let rebutted = is_word && candidate.contains(self.stem.as_str());

        self.end_turn();
        self.log.flush();
        self.log.push(LogEvent::Rebuttal {
            player: player.clone(),
            prefix,
            stem: self.stem.clone(),
            suffix,
        });
        let loser = if rebutted {
            self.record_used(candidate.clone());
            self.players.last_player().cloned()
        } else {
            Some(player)
        };
        self.log.push(LogEvent::ChallengeResult {
            word: candidate,
            is_word: rebutted,
            loser: loser.clone(),
        });
        if let Some(loser) = loser {
            self.penalize(&loser);
        }
        self.end_round();
        Ok(())
    }

    pub(super) fn concede(&mut self, credentials: &[Credential]) -> Result<(), RoomError> {
        self.touch();
        let username = self.authenticate(credentials)?;
        match self.phase {
            Phase::WaitingToStart => {
                return Err(RoomError::WrongPhase {
                    action: "concede",
                    phase: self.phase,
                });
            }
            Phase::Edit => {
                if self.players.current_username() != Some(&username) {
                    return Err(RoomError::NotYourTurn);
                }
                if self.stem.is_empty() {
                    return Err(RoomError::EmptyStem);
                }
            }
            Phase::Rebut => {
                let contested = self.players.current_username() == Some(&username)
                    || self.players.last_player() == Some(&username);
                if !contested {
                    return Err(RoomError::NotYourTurn);
                }
            }
        }

        self.end_turn();
        self.log.flush();
        self.log.push(LogEvent::Concession {
            player: username.clone(),
        });
        self.penalize(&username);
        self.end_round();
        Ok(())
    }

    pub(super) fn chat(
        &mut self,
        credentials: &[Credential],
        content: &str,
    ) -> Result<ChatMessage, RoomError> {
        self.touch();
        let sender = self.authenticate(credentials)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(RoomError::EmptyMessage);
        }
        Ok(ChatMessage {
            sender,
            content: content.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Scoring and rounds
    // -----------------------------------------------------------------------

    fn record_used(&mut self, word: String) {
        if !self.config.allow_repeat_words {
            self.used_words.insert(word);
        }
    }

    /// One penalty point; logs `Elimination` if it crossed the threshold.
    fn penalize(&mut self, username: &Username) {
        let threshold = self.config.elimination_threshold;
        let Some(player) = self.players.get_mut(username) else {
            return;
        };
        if player.add_point(threshold) {
            info!(room_id = %self.room_id, %username, "player eliminated");
            self.log.push(LogEvent::Elimination {
                player: username.clone(),
            });
        }
    }

    /// Clears the stem and either ends the game or sets up the next
    /// round. No clock is armed; the first move of the round does that.
    fn end_round(&mut self) {
        self.disarm_clock();
        self.stem.clear();

        let game_over = self.players.len() < 2 || self.players.non_eliminated_count() < 2;
        if game_over {
            match self.players.sole_survivor() {
                Some(winner) if self.players.len() >= 2 => {
                    info!(room_id = %self.room_id, %winner, "game over");
                    self.log.push(LogEvent::GameOver { winner });
                }
                _ => {
                    info!(room_id = %self.room_id, "game over: insufficient players");
                    self.log.push(LogEvent::InsufficientPlayers);
                }
            }
            self.players.reset_scores();
            self.used_words.clear();
            self.game_started = false;
        }

        if !self.players.is_empty() {
            self.players.advance_round_starter();
            self.players.start_round();
        }
        self.players.reset_times(self.config.time_per_turn);
        self.players.clear_deadline();

        self.phase = if game_over {
            Phase::WaitingToStart
        } else if self.config.pause_at_round_start {
            self.players.clear_ready();
            Phase::WaitingToStart
        } else {
            Phase::Edit
        };
    }

    // -----------------------------------------------------------------------
    // Turn clock
    // -----------------------------------------------------------------------

    /// Starts the current player's clock for their banked time.
    fn arm_clock(&mut self) {
        if !self.config.is_timed() {
            return;
        }
        let Some(expected) = self.players.current_username().cloned() else {
            return;
        };
        debug_assert!(self.clock.is_none(), "turn clock armed while another is outstanding");

        let now = Instant::now();
        self.players.set_deadline(now);
        let budget = self
            .players
            .current()
            .map(Player::time_remaining)
            .unwrap_or_default();
        self.turn_epoch += 1;
        let epoch = self.turn_epoch;
        trace!(room_id = %self.room_id, %expected, ?budget, epoch, "turn clock armed");

        let shared = self.shared.clone();
        self.clock = Some(Countdown::start(budget, async move {
            if let Some(shared) = shared.upgrade() {
                shared.turn_expired(epoch, expected).await;
            }
        }));
    }

    /// Cancels the turn clock, if any, and invalidates its epoch.
    fn disarm_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            if !clock.cancel() {
                trace!(
                    room_id = %self.room_id,
                    epoch = self.turn_epoch,
                    "turn clock fired before disarm"
                );
            }
        }
        self.turn_epoch += 1;
    }

    /// Stops the clock and banks the current player's unused time.
    fn end_turn(&mut self) {
        self.disarm_clock();
        self.players.end_turn(Instant::now());
    }

    /// Applies a timeout if the clock that fired is still the live one.
    /// Returns `false` for a stale clock.
    pub(super) fn turn_expired(&mut self, epoch: u64, expected: &Username) -> bool {
        let live = epoch == self.turn_epoch
            && self.phase.is_in_round()
            && self.players.current_username() == Some(expected);
        if !live {
            debug!(room_id = %self.room_id, %expected, epoch, "stale turn clock ignored");
            return false;
        }

        self.touch();
        self.clock = None;
        self.players.end_turn(Instant::now());
        info!(room_id = %self.room_id, player = %expected, "turn timed out");

        self.log.flush();
        self.log.push(LogEvent::Timeout {
            player: expected.clone(),
        });
        self.penalize(expected);
        self.end_round();
        true
    }

    // -----------------------------------------------------------------------
    // Scheduled leave
    // -----------------------------------------------------------------------

    pub(super) fn schedule_leave(&mut self, credentials: &[Credential]) -> Result<(), RoomError> {
        let username = self.authenticate(credentials)?;
        if self.pending_leaves.contains_key(&username) {
            return Err(RoomError::LeaveAlreadyScheduled(username));
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let shared = self.shared.clone();
        let name = username.clone();
        let countdown = Countdown::start(self.config.leave_grace, async move {
            if let Some(shared) = shared.upgrade() {
                shared.scheduled_leave_fired(name, ticket).await;
            }
        });
        debug!(room_id = %self.room_id, %username, ticket, "leave scheduled");
        self.pending_leaves.insert(username, PendingLeave { ticket, countdown });
        Ok(())
    }

    /// Returns whether a pending leave was cancelled.
    pub(super) fn cancel_leave(&mut self, credentials: &[Credential]) -> Result<bool, RoomError> {
        let username = self.authenticate(credentials)?;
        match self.pending_leaves.remove(&username) {
            Some(pending) => {
                pending.countdown.cancel();
                debug!(room_id = %self.room_id, %username, "scheduled leave cancelled");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Carries out a scheduled leave whose grace period ran out. Returns
    /// `false` if it was cancelled or superseded in the meantime.
    pub(super) fn scheduled_leave_fired(&mut self, username: &Username, ticket: u64) -> bool {
        match self.pending_leaves.get(username) {
            Some(pending) if pending.ticket == ticket => {}
            _ => {
                debug!(room_id = %self.room_id, %username, ticket, "stale leave timer ignored");
                return false;
            }
        }
        self.pending_leaves.remove(username);
        if !self.players.contains(username) {
            return false;
        }

        self.touch();
        self.log.flush();
        self.log.push(LogEvent::Leave {
            player: username.clone(),
        });
        if let Err(err) = self.remove_player(username) {
            warn!(room_id = %self.room_id, %username, %err, "scheduled leave failed");
        }
        true
    }

    // -----------------------------------------------------------------------
    // Views and lifecycle
    // -----------------------------------------------------------------------

    pub(super) fn snapshot(&self, full_log: bool) -> RoomSnapshot {
        let log = if full_log {
            self.log.full()
        } else {
            self.log.pending()
        };
        RoomSnapshot {
            players: self.players.players().iter().map(Player::view).collect(),
            stem: self.stem.clone(),
            phase: self.phase,
            current_player: self.players.current_username().cloned(),
            deadline_ms: self.players.deadline().map(unix_millis),
            last_player: self.players.last_player().cloned(),
            round_starter: self.players.round_starter(),
            log: log.to_vec(),
        }
    }

    pub(super) fn metadata(&self) -> RoomListEntry {
        RoomListEntry {
            room_id: self.room_id,
            player_count: self.players.len(),
            max_players: self.config.max_players,
            phase: self.phase,
            min_word_length: self.config.min_word_length,
            elimination_threshold: self.config.elimination_threshold,
        }
    }

    pub(super) fn last_touch(&self) -> Instant {
        self.last_touch
    }

    pub(super) fn has_pending_leave(&self, username: &Username) -> bool {
        self.pending_leaves.contains_key(username)
    }

    /// Cancels every timer the room owns.
    pub(super) fn teardown(&mut self) {
        for (_, pending) in self.pending_leaves.drain() {
            pending.countdown.cancel();
        }
        self.disarm_clock();
        self.players.clear_deadline();
        debug!(room_id = %self.room_id, "room torn down");
    }
}

/// Exactly one ASCII letter, as a prefix or as a suffix but not both.
fn parse_affix(prefix: &str, suffix: &str) -> Result<(char, Side), RoomError> {
    let (letters, side) = match (prefix.is_empty(), suffix.is_empty()) {
        (false, true) => (prefix, Side::Prefix),
        (true, false) => (suffix, Side::Suffix),
        _ => return Err(RoomError::InvalidAffix),
    };
    let mut chars = letters.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            Ok((letter.to_ascii_uppercase(), side))
        }
        _ => Err(RoomError::InvalidAffix),
    }
}

/// Converts a monotonic deadline into Unix milliseconds.
fn unix_millis(deadline: Instant) -> u64 {
    let remaining = deadline.saturating_duration_since(Instant::now());
    (SystemTime::now() + remaining)
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_affix_accepts_single_letter() {
        assert_eq!(parse_affix("a", "").unwrap(), ('A', Side::Prefix));
        assert_eq!(parse_affix("", "z").unwrap(), ('Z', Side::Suffix));
    }

    #[test]
    fn test_parse_affix_rejects_everything_else() {
        let cases = [("", ""), ("a", "b"), ("ab", ""), ("", "1"), ("é", ""), (" ", "")];
        for (prefix, suffix) in cases {
            assert!(
                matches!(parse_affix(prefix, suffix), Err(RoomError::InvalidAffix)),
                "({prefix:?}, {suffix:?}) should be rejected"
            );
        }
    }
}
