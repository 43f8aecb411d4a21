//! Who hears about each room.
//!
//! Every connection bound to a room (as a player or a watcher) has an
//! outbox registered here. Broadcasting clones the message into each
//! outbox; a connection's writer task drains its own.

use std::collections::HashMap;

use superghost_protocol::{RoomId, ServerMessage, Username};
use superghost_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};

/// Sender half of a connection's outgoing queue.
pub(crate) type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Default)]
pub(crate) struct Listeners {
    rooms: Mutex<HashMap<RoomId, HashMap<ConnectionId, Outbox>>>,
    /// The connection currently holding each seat. A resumed seat moves
    /// to the new connection, so the old one closing late is harmless.
    seats: Mutex<HashMap<(RoomId, Username), ConnectionId>>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn subscribe(&self, room_id: RoomId, conn_id: ConnectionId, outbox: Outbox) {
        self.rooms
            .lock()
            .await
            .entry(room_id)
            .or_default()
            .insert(conn_id, outbox);
    }

    pub(crate) async fn unsubscribe(&self, room_id: RoomId, conn_id: ConnectionId) {
        let mut rooms = self.rooms.lock().await;
        if let Some(group) = rooms.get_mut(&room_id) {
            group.remove(&conn_id);
            if group.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// Sends `msg` to every listener of `room_id`. Outboxes whose writer
    /// has gone are dropped. Returns how many received it.
    pub(crate) async fn broadcast(&self, room_id: RoomId, msg: ServerMessage) -> usize {
        let mut rooms = self.rooms.lock().await;
        let Some(group) = rooms.get_mut(&room_id) else {
            return 0;
        };
        group.retain(|_, outbox| outbox.send(msg.clone()).is_ok());
        let delivered = group.len();
        if group.is_empty() {
            rooms.remove(&room_id);
        }
        tracing::trace!(%room_id, delivered, "broadcast");
        delivered
    }

    /// Forgets every listener and seat of an evicted room.
    pub(crate) async fn remove_room(&self, room_id: RoomId) {
        self.rooms.lock().await.remove(&room_id);
        self.seats.lock().await.retain(|(room, _), _| *room != room_id);
    }

    /// Records `conn_id` as the holder of a seat, replacing any other.
    pub(crate) async fn take_seat(
        &self,
        room_id: RoomId,
        username: Username,
        conn_id: ConnectionId,
    ) {
        self.seats.lock().await.insert((room_id, username), conn_id);
    }

    /// Gives up a seat if `conn_id` still holds it. Returns whether it
    /// did.
    pub(crate) async fn release_seat(
        &self,
        room_id: RoomId,
        username: &Username,
        conn_id: ConnectionId,
    ) -> bool {
        let mut seats = self.seats.lock().await;
        let key = (room_id, username.clone());
        if seats.get(&key) == Some(&conn_id) {
            seats.remove(&key);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    async fn count(&self, room_id: RoomId) -> usize {
        self.rooms.lock().await.get(&room_id).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> ServerMessage {
        ServerMessage::Error {
            code: 400,
            message: "x".into(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_only() {
        let listeners = Listeners::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        listeners.subscribe(RoomId(1), ConnectionId::new(1), tx1).await;
        listeners.subscribe(RoomId(2), ConnectionId::new(2), tx2).await;

        assert_eq!(listeners.broadcast(RoomId(1), notice()).await, 1);
        assert_eq!(rx1.try_recv().unwrap(), notice());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_prunes_closed_outboxes() {
        let listeners = Listeners::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        listeners.subscribe(RoomId(1), ConnectionId::new(1), tx1).await;
        listeners.subscribe(RoomId(1), ConnectionId::new(2), tx2).await;
        drop(rx1);

        assert_eq!(listeners.broadcast(RoomId(1), notice()).await, 1);
        assert_eq!(listeners.count(RoomId(1)).await, 1);
    }

    #[tokio::test]
    async fn test_seat_moves_to_latest_connection() {
        let listeners = Listeners::new();
        let alice = Username::from("alice");
        listeners.take_seat(RoomId(1), alice.clone(), ConnectionId::new(1)).await;
        listeners.take_seat(RoomId(1), alice.clone(), ConnectionId::new(2)).await;

        assert!(!listeners.release_seat(RoomId(1), &alice, ConnectionId::new(1)).await);
        assert!(listeners.release_seat(RoomId(1), &alice, ConnectionId::new(2)).await);
        assert!(!listeners.release_seat(RoomId(1), &alice, ConnectionId::new(2)).await);
    }

    #[tokio::test]
    async fn test_unsubscribe_and_remove_room() {
        let listeners = Listeners::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        listeners.subscribe(RoomId(1), ConnectionId::new(1), tx.clone()).await;
        listeners.subscribe(RoomId(1), ConnectionId::new(2), tx).await;

        listeners.unsubscribe(RoomId(1), ConnectionId::new(1)).await;
        assert_eq!(listeners.count(RoomId(1)).await, 1);

        listeners.remove_room(RoomId(1)).await;
        assert_eq!(listeners.broadcast(RoomId(1), notice()).await, 0);
    }
}
