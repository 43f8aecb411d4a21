//! Turn clocks and scheduled leaves, run on a paused clock.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use superghost_protocol::{Credential, LogEvent, RoomConfig, RoomId, Username};
use superghost_room::{
    AsyncUpdate, Dictionary, OracleError, Room, RoomError, UpdateCause, WordOracle,
};
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

const ROOM: RoomId = RoomId(7);
const TURN: Duration = Duration::from_secs(10);

// =========================================================================
// Helpers
// =========================================================================

fn timed(config: RoomConfig) -> RoomConfig {
    RoomConfig {
        time_per_turn: TURN,
        ..config
    }
}

fn room_with<O: WordOracle>(
    config: RoomConfig,
    oracle: O,
) -> (Room<O>, mpsc::UnboundedReceiver<AsyncUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Room::new(ROOM, config, oracle, tx), rx)
}

fn room(config: RoomConfig) -> (Room<Dictionary>, mpsc::UnboundedReceiver<AsyncUpdate>) {
    room_with(config, Dictionary::parse("ghost"))
}

fn name(s: &str) -> Username {
    Username::from(s)
}

async fn join<O: WordOracle>(room: &Room<O>, username: &str) -> Credential {
    room.join(name(username)).await.expect("join should succeed")
}

/// Lets spawned timer tasks run without moving the paused clock.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn time_left<O: WordOracle>(room: &Room<O>, username: &str) -> u64 {
    room.snapshot()
        .await
        .players
        .iter()
        .find(|p| p.username.as_str() == username)
        .map(|p| p.time_remaining_ms)
        .expect("player should be seated")
}

/// Holds every lookup until released.
struct GatedOracle {
    words: Dictionary,
    gate: Notify,
}

impl WordOracle for GatedOracle {
    fn is_word(
        &self,
        candidate: &str,
        used: &HashSet<String>,
    ) -> impl Future<Output = Result<bool, OracleError>> + Send {
        let verdict = !used.contains(candidate) && self.words.contains(candidate);
        async move {
            self.gate.notified().await;
            Ok(verdict)
        }
    }
}

// =========================================================================
// Turn clock
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timeout_penalizes_and_notifies() {
    let (room, mut rx) = room(timed(RoomConfig::default()));
    let alice = join(&room, "alice").await;
    join(&room, "bob").await;
    let start = Instant::now();

    room.affix(&[alice], "", "g").await.unwrap();
    let update = rx.recv().await.expect("timeout should be published");

    assert_eq!(
        update,
        AsyncUpdate {
            room_id: ROOM,
            cause: UpdateCause::TurnTimeout,
        }
    );
    assert_eq!(start.elapsed(), TURN);
    let snapshot = room.snapshot().await;
    assert_eq!(snapshot.log, vec![LogEvent::Timeout { player: name("bob") }]);
    assert_eq!(snapshot.stem, "");
    assert_eq!(snapshot.deadline_ms, None);
    assert_eq!(snapshot.current_player, Some(name("bob")));
    assert_eq!(snapshot.players[1].score, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_can_end_the_game() {
    let (room, mut rx) = room(timed(RoomConfig {
        elimination_threshold: 1,
        ..RoomConfig::default()
    }));
    let alice = join(&room, "alice").await;
    join(&room, "bob").await;

    room.affix(&[alice], "", "g").await.unwrap();
    rx.recv().await.expect("timeout should be published");

    assert_eq!(
        room.snapshot().await.log,
        vec![
            LogEvent::Timeout { player: name("bob") },
            LogEvent::Elimination { player: name("bob") },
            LogEvent::GameOver { winner: name("alice") },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_moves_bank_unused_time() {
    let (room, _rx) = room(timed(RoomConfig::default()));
    let alice = join(&room, "alice").await;
    let bob = join(&room, "bob").await;

    room.affix(&[alice], "", "g").await.unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;
    room.affix(&[bob], "", "h").await.unwrap();

    assert_eq!(time_left(&room, "bob").await, 7_000);
    assert_eq!(time_left(&room, "alice").await, 10_000);
    room.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_round_end_cancels_clock() {
    let (room, mut rx) = room(timed(RoomConfig::default()));
    let alice = join(&room, "alice").await;
    let bob = join(&room, "bob").await;

    room.affix(&[alice], "", "g").await.unwrap();
    tokio::time::advance(Duration::from_secs(9)).await;
    room.concede(&[bob]).await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;

    assert!(rx.try_recv().is_err());
    assert_eq!(room.snapshot().await.players[1].score, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fired_clock_loses_to_move_holding_the_lock() {
    let oracle = Arc::new(GatedOracle {
        words: Dictionary::parse("ghost"),
        gate: Notify::new(),
    });
    let (room, mut rx) = room_with(
        timed(RoomConfig {
            min_word_length: 1,
            ..RoomConfig::default()
        }),
        Arc::clone(&oracle),
    );
    let alice = join(&room, "alice").await;
    let bob = join(&room, "bob").await;
    room.affix(&[alice], "", "g").await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;

    // Bob challenges just before his clock runs out; the lookup stalls.
    let challenge = tokio::spawn({
        let room = room.clone();
        async move { room.challenge_is_word(&[bob]).await }
    });
    settle().await;

    // The clock fires and queues behind the challenge.
    tokio::time::advance(Duration::from_secs(6)).await;
    settle().await;

    oracle.gate.notify_one();
    challenge.await.unwrap().expect("challenge should succeed");
    settle().await;

    assert!(rx.try_recv().is_err(), "stale clock must not publish");
    let full = room.full_snapshot().await;
    assert!(!full.log.iter().any(|e| matches!(e, LogEvent::Timeout { .. })));
    assert_eq!(full.players[1].score, 1);
}

#[tokio::test(start_paused = true)]
async fn test_kicked_player_budget_not_inherited() {
    let (room, mut rx) = room(timed(RoomConfig::default()));
    let alice = join(&room, "alice").await;
    let bob = join(&room, "bob").await;
    let carol = join(&room, "carol").await;
    let step = Duration::from_secs(1);

    room.affix(&[alice.clone()], "", "a").await.unwrap();
    tokio::time::advance(4 * step).await;
    room.affix(&[bob], "", "b").await.unwrap();
    tokio::time::advance(step).await;
    room.affix(&[carol.clone()], "", "c").await.unwrap();
    tokio::time::advance(step).await;
    room.affix(&[alice.clone()], "", "d").await.unwrap();
    tokio::time::advance(step).await;

    // Bob is on the clock with about five seconds left.
    room.vote_kick(&[alice], name("bob")).await.unwrap();
    room.vote_kick(&[carol], name("bob")).await.unwrap();

    let snapshot = room.snapshot().await;
    assert_eq!(snapshot.current_player, Some(name("carol")));
    assert_eq!(snapshot.stem, "ABCD");
    assert_eq!(time_left(&room, "carol").await, 9_000);

    tokio::time::advance(Duration::from_millis(8_500)).await;
    settle().await;
    assert!(rx.try_recv().is_err());

    let update = rx.recv().await.expect("carol should time out");
    assert_eq!(update.cause, UpdateCause::TurnTimeout);
    let snapshot = room.snapshot().await;
    assert_eq!(snapshot.log, vec![LogEvent::Timeout { player: name("carol") }]);
}

#[tokio::test(start_paused = true)]
async fn test_untimed_room_never_arms_clock() {
    let (room, mut rx) = room(RoomConfig {
        time_per_turn: Duration::ZERO,
        ..RoomConfig::default()
    });
    let alice = join(&room, "alice").await;
    join(&room, "bob").await;

    room.affix(&[alice], "", "g").await.unwrap();
    assert_eq!(room.snapshot().await.deadline_ms, None);
    tokio::time::advance(Duration::from_secs(3600)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
}

// =========================================================================
// Scheduled leave
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduled_leave_fires_after_grace() {
    let (room, mut rx) = room(RoomConfig::default());
    let alice = join(&room, "alice").await;
    join(&room, "bob").await;
    let start = Instant::now();

    room.schedule_leave(&[alice.clone()]).await.unwrap();
    assert!(room.has_pending_leave(&name("alice")).await);

    let update = rx.recv().await.expect("leave should be published");
    assert_eq!(update.cause, UpdateCause::ScheduledLeave);
    assert_eq!(start.elapsed(), Duration::from_millis(500));

    let snapshot = room.snapshot().await;
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(
        snapshot.log,
        vec![
            LogEvent::Leave { player: name("alice") },
            LogEvent::InsufficientPlayers,
        ]
    );
    let late = room.cancel_leave(&[alice]).await;
    assert!(matches!(late, Err(RoomError::Unauthorized)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_leave_keeps_seat() {
    let (room, mut rx) = room(RoomConfig::default());
    let alice = join(&room, "alice").await;
    join(&room, "bob").await;

    room.schedule_leave(&[alice.clone()]).await.unwrap();
    let twice = room.schedule_leave(&[alice.clone()]).await;
    assert!(matches!(twice, Err(RoomError::LeaveAlreadyScheduled(_))));

    assert!(room.cancel_leave(&[alice.clone()]).await.unwrap());
    assert!(!room.cancel_leave(&[alice]).await.unwrap());

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(room.snapshot().await.players.len(), 2);
    assert!(!room.has_pending_leave(&name("alice")).await);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_current_player_hands_over_fresh_clock() {
    let (room, mut rx) = room(timed(RoomConfig::default()));
    let alice = join(&room, "alice").await;
    let bob = join(&room, "bob").await;
    join(&room, "carol").await;
    let start = Instant::now();

    room.affix(&[alice], "", "g").await.unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    room.schedule_leave(&[bob]).await.unwrap();

    let first = rx.recv().await.expect("leave should be published");
    assert_eq!(first.cause, UpdateCause::ScheduledLeave);
    let snapshot = room.snapshot().await;
    assert_eq!(snapshot.current_player, Some(name("carol")));
    assert_eq!(snapshot.stem, "G");
    assert!(snapshot.deadline_ms.is_some());

    let second = rx.recv().await.expect("carol should time out");
    assert_eq!(second.cause, UpdateCause::TurnTimeout);
    assert_eq!(start.elapsed(), Duration::from_millis(2_500) + TURN);
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_all_timers() {
    let (room, mut rx) = room(timed(RoomConfig::default()));
    let alice = join(&room, "alice").await;
    let bob = join(&room, "bob").await;

    room.affix(&[alice], "", "g").await.unwrap();
    room.schedule_leave(&[bob]).await.unwrap();
    room.teardown().await;

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
    let snapshot = room.snapshot().await;
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.deadline_ms, None);
}
