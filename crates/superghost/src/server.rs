//! `SuperghostServer` builder and server loop.
//!
//! This is the entry point for running a Superghost server. It ties the
//! layers together: transport → protocol → room, plus two background
//! tasks: the broadcaster, which turns timer-driven room changes into
//! state pushes, and the evictor, which drops idle rooms.

use std::sync::Arc;
use std::time::Duration;

use superghost_protocol::{Codec, JsonCodec, ServerMessage};
use superghost_room::{AsyncUpdate, RoomManager, WordOracle};
use superghost_transport::{Transport, WebSocketTransport};
use tokio::sync::mpsc;

use crate::SuperghostError;
use crate::handler::handle_connection;
use crate::listeners::Listeners;

/// Default time a room may sit untouched before it is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default interval between idle sweeps.
pub const DEFAULT_EVICTION_PERIOD: Duration = Duration::from_secs(60);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<O: WordOracle + Clone, C: Codec> {
    pub(crate) rooms: RoomManager<O>,
    pub(crate) listeners: Listeners,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Superghost server.
///
/// # Example
///
/// ```rust,no_run
/// use superghost::prelude::*;
///
/// # async fn run() -> Result<(), SuperghostError> {
/// let server = SuperghostServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(Dictionary::parse("ghost ghoul testing"))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct SuperghostServerBuilder {
    bind_addr: String,
    idle_timeout: Duration,
    eviction_period: Duration,
}

impl SuperghostServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            eviction_period: DEFAULT_EVICTION_PERIOD,
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// How long a room may go untouched before it is torn down.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// How often to sweep for idle rooms. Zero is bumped to one second.
    pub fn eviction_period(mut self, period: Duration) -> Self {
        self.eviction_period = period.max(Duration::from_secs(1));
        self
    }

    /// Binds the listener. Every room shares `oracle`.
    pub async fn build<O: WordOracle + Clone>(
        self,
        oracle: O,
    ) -> Result<SuperghostServer<O, JsonCodec>, SuperghostError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let state = Arc::new(ServerState {
            rooms: RoomManager::new(oracle, updates_tx),
            listeners: Listeners::new(),
            codec: JsonCodec,
        });

        Ok(SuperghostServer {
            transport,
            state,
            updates: updates_rx,
            idle_timeout: self.idle_timeout,
            eviction_period: self.eviction_period,
        })
    }
}

impl Default for SuperghostServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Superghost server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SuperghostServer<O: WordOracle + Clone, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<O, C>>,
    updates: mpsc::UnboundedReceiver<AsyncUpdate>,
    idle_timeout: Duration,
    eviction_period: Duration,
}

impl<O, C> SuperghostServer<O, C>
where
    O: WordOracle + Clone,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each connection gets its own handler task.
    pub async fn run(mut self) -> Result<(), SuperghostError> {
        tracing::info!(
            idle_timeout = ?self.idle_timeout,
            eviction_period = ?self.eviction_period,
            "Superghost server running"
        );

        tokio::spawn(broadcast_updates(Arc::clone(&self.state), self.updates));
        tokio::spawn(evict_idle_rooms(
            Arc::clone(&self.state),
            self.idle_timeout,
            self.eviction_period,
        ));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Pushes fresh state to a room's listeners whenever a timer changed it.
async fn broadcast_updates<O, C>(
    state: Arc<ServerState<O, C>>,
    mut updates: mpsc::UnboundedReceiver<AsyncUpdate>,
) where
    O: WordOracle + Clone,
    C: Codec,
{
    while let Some(update) = updates.recv().await {
        let room = state.rooms.get(update.room_id).await;
        let Ok(room) = room else {
            tracing::debug!(room_id = %update.room_id, "update for a room that is gone");
            continue;
        };
        tracing::debug!(
            room_id = %update.room_id,
            cause = ?update.cause,
            "broadcasting async update"
        );
        let snapshot = room.snapshot().await;
        state
            .listeners
            .broadcast(
                update.room_id,
                ServerMessage::State {
                    room_id: update.room_id,
                    snapshot,
                },
            )
            .await;
    }
}

/// Periodically tears down rooms nobody has touched for `idle_timeout`.
async fn evict_idle_rooms<O, C>(
    state: Arc<ServerState<O, C>>,
    idle_timeout: Duration,
    period: Duration,
) where
    O: WordOracle + Clone,
    C: Codec,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let evicted = state.rooms.evict_idle(idle_timeout).await;
        for room_id in evicted {
            state.listeners.remove_room(room_id).await;
        }
    }
}
