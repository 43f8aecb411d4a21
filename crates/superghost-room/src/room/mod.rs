//! The synchronized room API.
//!
//! A [`Room`] is a cheap, cloneable handle around one `Arc`. Behind it
//! sits a single `tokio::sync::Mutex` guarding the game core; every
//! method holds that lock for its whole duration, including the word
//! oracle call. A slow oracle therefore stalls the room, but nothing can
//! change between validating a move and applying it.
//!
//! Timers (the turn clock and scheduled leaves) run as separate tasks.
//! When one fires it takes the same lock, re-checks that it is still
//! current, applies its effect, and publishes an [`AsyncUpdate`] so the
//! owner can broadcast fresh state. Timer tasks only hold a `Weak`
//! reference, so they never keep a dropped room alive.

mod game;

use std::sync::Arc;

use superghost_protocol::{
    ChatMessage, Credential, RoomConfig, RoomId, RoomListEntry, RoomSnapshot, Username,
};
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tokio::time::Instant;
use tracing::debug;

use crate::{RoomError, WordOracle};
use game::Game;

/// Why a room changed without a request driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCause {
    TurnTimeout,
    ScheduledLeave,
}

/// Published when a timer mutates a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncUpdate {
    pub room_id: RoomId,
    pub cause: UpdateCause,
}

/// Sender half for [`AsyncUpdate`]s. Unbounded, so timers never block
/// and never drop a notification while a receiver exists.
pub type UpdateSender = mpsc::UnboundedSender<AsyncUpdate>;

struct Shared<O: WordOracle> {
    room_id: RoomId,
    config: RoomConfig,
    oracle: O,
    updates: UpdateSender,
    game: Mutex<Game<O>>,
}

impl<O: WordOracle> Shared<O> {
    async fn turn_expired(&self, epoch: u64, expected: Username) {
        let applied = self.game.lock().await.turn_expired(epoch, &expected);
        if applied {
            self.notify(UpdateCause::TurnTimeout);
        }
    }

    async fn scheduled_leave_fired(&self, username: Username, ticket: u64) {
        let applied = self.game.lock().await.scheduled_leave_fired(&username, ticket);
        if applied {
            self.notify(UpdateCause::ScheduledLeave);
        }
    }

    fn notify(&self, cause: UpdateCause) {
        let update = AsyncUpdate {
            room_id: self.room_id,
            cause,
        };
        if self.updates.send(update).is_err() {
            debug!(room_id = %self.room_id, ?cause, "no listener for async update");
        }
    }
}

/// Handle to one Superghost room.
///
/// ## Example
///
/// ```rust
/// # use superghost_room::{Dictionary, Room};
/// # use superghost_protocol::{Phase, RoomConfig, RoomId, Username};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
/// let room = Room::new(RoomId(1), RoomConfig::default(), Dictionary::parse("ghost"), tx);
///
/// let alice = room.join(Username::from("alice")).await.unwrap();
/// let _bob = room.join(Username::from("bob")).await.unwrap();
///
/// room.affix(&[alice], "g", "").await.unwrap();
/// let snapshot = room.snapshot().await;
/// assert_eq!(snapshot.stem, "G");
/// assert_eq!(snapshot.phase, Phase::Edit);
/// # }
/// ```
pub struct Room<O: WordOracle> {
    shared: Arc<Shared<O>>,
}

impl<O: WordOracle> Clone for Room<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<O: WordOracle> Room<O> {
    /// Creates a room. `config` is clamped with [`RoomConfig::validated`].
    pub fn new(room_id: RoomId, config: RoomConfig, oracle: O, updates: UpdateSender) -> Self {
        let config = config.validated();
        let shared = Arc::new_cyclic(|weak| Shared {
            room_id,
            config: config.clone(),
            oracle,
            updates,
            game: Mutex::new(Game::new(weak.clone(), room_id, config)),
        });
        Self { shared }
    }

    pub fn id(&self) -> RoomId {
        self.shared.room_id
    }

    /// The immutable settings this room was created with.
    pub fn config(&self) -> &RoomConfig {
        &self.shared.config
    }

    pub fn is_public(&self) -> bool {
        self.shared.config.is_public
    }

    async fn lock(&self) -> MutexGuard<'_, Game<O>> {
        self.shared.game.lock().await
    }

    fn traced<T>(
        &self,
        action: &'static str,
        result: Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        if let Err(err) = &result {
            debug!(room_id = %self.shared.room_id, action, %err, "action rejected");
        }
        result
    }

    // -- Membership ---------------------------------------------------------

    /// Adds a player and returns the credential they must present from
    /// now on.
    pub async fn join(&self, username: Username) -> Result<Credential, RoomError> {
        let result = self.lock().await.join(username);
        self.traced("join", result)
    }

    /// Declares the caller ready. The round starts once every player is.
    pub async fn ready(&self, credentials: &[Credential]) -> Result<(), RoomError> {
        let result = self.lock().await.ready(credentials);
        self.traced("ready", result)
    }

    pub async fn leave(&self, credentials: &[Credential]) -> Result<(), RoomError> {
        let result = self.lock().await.leave(credentials);
        self.traced("leave", result)
    }

    /// Votes to remove `target`. The target goes once their distinct
    /// voters reach `kick_ratio` of the roster.
    pub async fn vote_kick(
        &self,
        credentials: &[Credential],
        target: Username,
    ) -> Result<(), RoomError> {
        let result = self.lock().await.vote_kick(credentials, target);
        self.traced("vote_kick", result)
    }

    /// Leaves after the configured grace period unless cancelled first.
    pub async fn schedule_leave(&self, credentials: &[Credential]) -> Result<(), RoomError> {
        let result = self.lock().await.schedule_leave(credentials);
        self.traced("schedule_leave", result)
    }

    /// Cancels the caller's scheduled leave. `Ok(false)` if none was
    /// pending.
    pub async fn cancel_leave(&self, credentials: &[Credential]) -> Result<bool, RoomError> {
        let result = self.lock().await.cancel_leave(credentials);
        self.traced("cancel_leave", result)
    }

    pub async fn has_pending_leave(&self, username: &Username) -> bool {
        self.lock().await.has_pending_leave(username)
    }

    // -- Moves --------------------------------------------------------------

    /// Adds one letter to the front (`prefix`) or back (`suffix`) of the
    /// stem. Exactly one of the two must hold a single letter.
    pub async fn affix(
        &self,
        credentials: &[Credential],
        prefix: &str,
        suffix: &str,
    ) -> Result<(), RoomError> {
        let result = self.lock().await.affix(credentials, prefix, suffix);
        self.traced("affix", result)
    }

    /// Claims the stem is already a word.
    pub async fn challenge_is_word(&self, credentials: &[Credential]) -> Result<(), RoomError> {
        let result = self
            .lock()
            .await
            .challenge_is_word(&self.shared.oracle, credentials)
            .await;
        self.traced("challenge_is_word", result)
    }

    /// Demands that the previous player show a word the stem leads to.
    pub async fn challenge_continuation(
        &self,
        credentials: &[Credential],
    ) -> Result<(), RoomError> {
        let result = self.lock().await.challenge_continuation(credentials);
        self.traced("challenge_continuation", result)
    }

    /// Answers a continuation challenge with letters around the stem.
    pub async fn rebut(
        &self,
        credentials: &[Credential],
        prefix: &str,
        suffix: &str,
    ) -> Result<(), RoomError> {
        let result = self
            .lock()
            .await
            .rebut(&self.shared.oracle, credentials, prefix, suffix)
            .await;
        self.traced("rebut", result)
    }

    pub async fn concede(&self, credentials: &[Credential]) -> Result<(), RoomError> {
        let result = self.lock().await.concede(credentials);
        self.traced("concede", result)
    }

    /// Validates a chat line for the owner to relay.
    pub async fn chat(
        &self,
        credentials: &[Credential],
        content: &str,
    ) -> Result<ChatMessage, RoomError> {
        let result = self.lock().await.chat(credentials, content);
        self.traced("chat", result)
    }

    // -- Queries ------------------------------------------------------------

    /// The username of the first credential that validates.
    pub async fn authenticate(&self, credentials: &[Credential]) -> Option<Username> {
        self.lock().await.authenticate(credentials).ok()
    }

    /// Current state with only the events of the latest action.
    pub async fn snapshot(&self) -> RoomSnapshot {
        self.lock().await.snapshot(false)
    }

    /// Current state with the whole event history.
    pub async fn full_snapshot(&self) -> RoomSnapshot {
        self.lock().await.snapshot(true)
    }

    pub async fn metadata(&self) -> RoomListEntry {
        self.lock().await.metadata()
    }

    /// When anyone last interacted with the room.
    pub async fn last_touch(&self) -> Instant {
        self.lock().await.last_touch()
    }

    /// Cancels every outstanding timer. Call before dropping an evicted
    /// room.
    pub async fn teardown(&self) {
        self.lock().await.teardown();
    }
}
