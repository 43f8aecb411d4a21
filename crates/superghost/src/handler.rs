//! Per-connection handler: request routing and room binding.
//!
//! Each accepted connection gets its own Tokio task running this handler
//! and a writer task draining its outbox. The flow is:
//!   1. Receive an envelope → decode the client request
//!   2. Dispatch it: lobby requests (create, list) answer directly; room
//!      requests go to the room the connection is bound to
//!   3. After a successful room action, broadcast fresh state to every
//!      listener of that room
//!
//! A connection binds to a room by `Join`, `Resume` or `Watch`. When a
//! seated connection drops, the seat is not freed at once: a leave is
//! scheduled, and a `Resume` within the grace period cancels it.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use superghost_protocol::{ClientRequest, Codec, Credential, Envelope, RoomId, ServerMessage};
use superghost_room::{Room, RoomError, WordOracle};
use superghost_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SuperghostError;
use crate::listeners::Outbox;
use crate::server::ServerState;

/// The room a connection is attached to, and the seat it holds there.
struct Binding<O: WordOracle> {
    room: Room<O>,
    credential: Option<Credential>,
}

struct Session<O: WordOracle + Clone, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<O, C>>,
    outbox: Outbox,
    binding: Option<Binding<O>>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<O, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<O, C>>,
) -> Result<(), SuperghostError>
where
    O: WordOracle + Clone,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), Arc::clone(&state), inbox));

    let mut session = Session {
        conn_id,
        state,
        outbox,
        binding: None,
    };
    let result = session.serve(&conn).await;
    session.release().await;

    // Dropping the last outbox lets the writer drain and stop.
    drop(session);
    if let Err(e) = writer.await {
        tracing::warn!(%conn_id, error = %e, "writer task failed");
    }
    result
}

/// Encodes and sends everything queued for one connection.
async fn write_frames<O, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<O, C>>,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) where
    O: WordOracle + Clone,
    C: Codec,
{
    let conn_id = conn.id();
    let mut seq: u64 = 1;
    while let Some(msg) = inbox.recv().await {
        let envelope = Envelope::server(next_seq(&mut seq), unix_millis(), msg);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode server message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

impl<O, C> Session<O, C>
where
    O: WordOracle + Clone,
    C: Codec,
{
    async fn serve(&mut self, conn: &WebSocketConnection) -> Result<(), SuperghostError> {
        loop {
            let data = match conn.recv().await {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::info!(conn_id = %self.conn_id, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(conn_id = %self.conn_id, error = %e, "recv error");
                    return Err(e.into());
                }
            };

            let request = match self.state.codec.decode_request(&data) {
                Ok((_, request)) => request,
                Err(e) => {
                    tracing::debug!(
                        conn_id = %self.conn_id,
                        error = %e,
                        "failed to decode request"
                    );
                    self.reply_error(400, format!("invalid request: {e}"));
                    continue;
                }
            };

            if let Err(err) = self.dispatch(request).await {
                self.reply_error(err.code(), err.to_string());
            }
        }
    }

    async fn dispatch(&mut self, request: ClientRequest) -> Result<(), RoomError> {
        match request {
            // -- Lobby ----------------------------------------------------
            ClientRequest::CreateRoom { config } => {
                let room = self.state.rooms.create_room(config).await;
                self.reply(ServerMessage::RoomCreated { room_id: room.id() });
            }

            ClientRequest::ListRooms => {
                let rooms = self.state.rooms.list_public().await;
                self.reply(ServerMessage::RoomList { rooms });
            }

            // -- Binding --------------------------------------------------
            ClientRequest::Watch { room_id } => {
                let room = self.find_room(room_id).await?;
                self.bind(room.clone(), None).await;
                let snapshot = room.full_snapshot().await;
                self.reply(ServerMessage::State { room_id, snapshot });
            }

            ClientRequest::Join { room_id, username } => {
                let room = self.find_room(room_id).await?;
                let credential = room.join(username).await?;
                self.bind(room.clone(), Some(credential.clone())).await;
                self.reply(ServerMessage::Joined { room_id, credential });
                self.broadcast_state(&room).await;
            }

            ClientRequest::Resume { room_id, credential } => {
                let room = self.find_room(room_id).await?;
                let presented = std::slice::from_ref(&credential);
                if room.authenticate(presented).await.is_none() {
                    return Err(RoomError::Unauthorized);
                }
                if room.cancel_leave(presented).await? {
                    tracing::info!(%room_id, username = %credential.username, "player resumed");
                }
                self.bind(room.clone(), Some(credential.clone())).await;
                self.reply(ServerMessage::Joined { room_id, credential });
                let snapshot = room.full_snapshot().await;
                self.reply(ServerMessage::State { room_id, snapshot });
            }

            // -- Game actions ---------------------------------------------
            ClientRequest::Ready => {
                let (room, creds) = self.seat()?;
                room.ready(&creds).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::Affix { prefix, suffix } => {
                let (room, creds) = self.seat()?;
                room.affix(&creds, &prefix, &suffix).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::ChallengeIsWord => {
                let (room, creds) = self.seat()?;
                room.challenge_is_word(&creds).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::ChallengeContinuation => {
                let (room, creds) = self.seat()?;
                room.challenge_continuation(&creds).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::Rebut { prefix, suffix } => {
                let (room, creds) = self.seat()?;
                room.rebut(&creds, &prefix, &suffix).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::Concede => {
                let (room, creds) = self.seat()?;
                room.concede(&creds).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::VoteKick { target } => {
                let (room, creds) = self.seat()?;
                room.vote_kick(&creds, target).await?;
                self.broadcast_state(&room).await;
            }

            ClientRequest::Leave => {
                let (room, creds) = self.seat()?;
                room.leave(&creds).await?;
                self.give_up_seat().await;
                self.broadcast_state(&room).await;
            }

            ClientRequest::Chat { content } => {
                let (room, creds) = self.seat()?;
                let message = room.chat(&creds, &content).await?;
                let room_id = room.id();
                self.state
                    .listeners
                    .broadcast(room_id, ServerMessage::Chat { room_id, message })
                    .await;
            }

            // -- Queries --------------------------------------------------
            ClientRequest::FullState => {
                let room = self.bound_room()?;
                let snapshot = room.full_snapshot().await;
                self.reply(ServerMessage::State {
                    room_id: room.id(),
                    snapshot,
                });
            }

            ClientRequest::GetConfig => {
                let room = self.bound_room()?;
                self.reply(ServerMessage::Config {
                    room_id: room.id(),
                    config: room.config().clone(),
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Binding
    // -----------------------------------------------------------------------

    async fn find_room(&self, room_id: RoomId) -> Result<Room<O>, RoomError> {
        self.state.rooms.get(room_id).await
    }

    fn bound_room(&self) -> Result<Room<O>, RoomError> {
        self.binding
            .as_ref()
            .map(|binding| binding.room.clone())
            .ok_or(RoomError::Unauthorized)
    }

    /// The bound room and the credential to act with.
    fn seat(&self) -> Result<(Room<O>, Vec<Credential>), RoomError> {
        match &self.binding {
            Some(Binding {
                room,
                credential: Some(credential),
            }) => Ok((room.clone(), vec![credential.clone()])),
            _ => Err(RoomError::Unauthorized),
        }
    }

    /// Attaches the connection to `room`, leaving any other seat it held.
    async fn bind(&mut self, room: Room<O>, credential: Option<Credential>) {
        if let Some(old) = self.binding.take() {
            let same_room = old.room.id() == room.id();
            if let Some(old_credential) = old.credential {
                if !same_room || credential.as_ref() != Some(&old_credential) {
                    self.vacate(&old.room, old_credential).await;
                }
            }
            if !same_room {
                self.state.listeners.unsubscribe(old.room.id(), self.conn_id).await;
            }
        }

        let room_id = room.id();
        self.state
            .listeners
            .subscribe(room_id, self.conn_id, self.outbox.clone())
            .await;
        if let Some(credential) = &credential {
            self.state
                .listeners
                .take_seat(room_id, credential.username.clone(), self.conn_id)
                .await;
        }
        tracing::debug!(
            conn_id = %self.conn_id,
            %room_id,
            seated = credential.is_some(),
            "connection bound"
        );
        self.binding = Some(Binding { room, credential });
    }

    /// Leaves a seat this connection is abandoning for another one.
    async fn vacate(&self, room: &Room<O>, credential: Credential) {
        self.state
            .listeners
            .release_seat(room.id(), &credential.username, self.conn_id)
            .await;
        match room.leave(&[credential]).await {
            Ok(()) => self.broadcast_state(room).await,
            Err(e) => tracing::debug!(
                conn_id = %self.conn_id,
                error = %e,
                "leaving previous seat failed"
            ),
        }
    }

    /// Drops the seat but keeps watching the room.
    async fn give_up_seat(&mut self) {
        if let Some(binding) = &mut self.binding {
            if let Some(credential) = binding.credential.take() {
                self.state
                    .listeners
                    .release_seat(binding.room.id(), &credential.username, self.conn_id)
                    .await;
            }
        }
    }

    /// Runs when the connection ends. A seat still held by this
    /// connection gets a scheduled leave.
    async fn release(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };
        let room_id = binding.room.id();
        self.state.listeners.unsubscribe(room_id, self.conn_id).await;

        let Some(credential) = binding.credential else {
            return;
        };
        let held = self
            .state
            .listeners
            .release_seat(room_id, &credential.username, self.conn_id)
            .await;
        if !held {
            tracing::debug!(conn_id = %self.conn_id, %room_id, "seat moved to another connection");
            return;
        }
        let username = credential.username.clone();
        match binding.room.schedule_leave(&[credential]).await {
            Ok(()) => tracing::info!(%room_id, %username, "disconnected, leave scheduled"),
            Err(e) => tracing::debug!(%room_id, %username, error = %e, "no leave scheduled"),
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    fn reply(&self, msg: ServerMessage) {
        if self.outbox.send(msg).is_err() {
            tracing::debug!(conn_id = %self.conn_id, "writer gone, reply dropped");
        }
    }

    fn reply_error(&self, code: u16, message: String) {
        self.reply(ServerMessage::Error { code, message });
    }

    async fn broadcast_state(&self, room: &Room<O>) {
        let room_id = room.id();
        let snapshot = room.snapshot().await;
        self.state
            .listeners
            .broadcast(room_id, ServerMessage::State { room_id, snapshot })
            .await;
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_counts_up() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }
}
