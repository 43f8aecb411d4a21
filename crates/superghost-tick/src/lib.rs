//! Cancellable one-shot countdowns for Superghost.
//!
//! A room runs two kinds of timers: the per-turn clock, and the grace
//! period of a scheduled leave. Both have the same shape. A deadline
//! races against an explicit stop, and exactly one of them wins:
//!
//! ```text
//!             ┌── deadline reached ──→ run on_expire
//! start() ────┤
//!             └── cancel() / drop ───→ nothing happens
//! ```
//!
//! [`Countdown::cancel`] reports which side won. When it returns `false`
//! the expiry callback is already running (or done), and the owner must
//! be prepared to see it arrive. Rooms guard against that with an epoch
//! or ticket check inside the callback.
//!
//! # Integration
//!
//! ```ignore
//! let weak = Arc::downgrade(&shared);
//! let clock = Countdown::start(budget, async move {
//!     if let Some(shared) = weak.upgrade() {
//!         shared.on_turn_timeout(epoch).await;
//!     }
//! });
//! // ... the player moves in time:
//! clock.cancel();
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::trace;

/// A running countdown. Dropping it cancels it.
#[derive(Debug)]
pub struct Countdown {
    deadline: Instant,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl Countdown {
    /// Spawns a task that runs `on_expire` once `duration` has elapsed,
    /// unless cancelled first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(duration: Duration, on_expire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + duration;
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            // `biased` polls the cancel branch first, so a cancel that was
            // sent before this task got polled always wins even if the
            // deadline has also passed by then.
            let expired = tokio::select! {
                biased;
                _ = cancel_rx => false,
                _ = time::sleep_until(deadline) => true,
            };
            // The receiver is gone from here on, so a late cancel() sees
            // a closed channel and reports that it lost.
            if expired {
                trace!(?duration, "countdown expired");
                on_expire.await;
            } else {
                trace!("countdown cancelled");
            }
        });

        Self {
            deadline,
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Stops the countdown.
    ///
    /// Returns `true` if the cancel won, meaning `on_expire` will never
    /// run. Returns `false` if the deadline won first.
    pub fn cancel(mut self) -> bool {
        self.stop()
    }

    /// The instant this countdown fires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline, saturating at zero.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn stop(&mut self) -> bool {
        match self.cancel_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
