//! Room manager: creates, finds, lists, and evicts rooms.
//!
//! The table lock is only ever held to insert, remove, or clone room
//! handles. Anything that needs a room's own lock runs after the table
//! lock is released, so a room stuck on a slow oracle call never stalls
//! lookups of other rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use superghost_protocol::{RoomConfig, RoomId, RoomListEntry};
use tokio::sync::RwLock;

use crate::{Room, RoomError, UpdateSender, WordOracle};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Owns the table of live rooms.
///
/// Every room shares one oracle (cloned into each) and one async update
/// channel, so a single broadcaster can serve all of them.
pub struct RoomManager<O: WordOracle + Clone> {
    rooms: RwLock<HashMap<RoomId, Room<O>>>,
    oracle: O,
    updates: UpdateSender,
}

impl<O: WordOracle + Clone> RoomManager<O> {
    pub fn new(oracle: O, updates: UpdateSender) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            oracle,
            updates,
        }
    }

    /// Creates a room and returns a handle to it.
    pub async fn create_room(&self, config: RoomConfig) -> Room<O> {
        let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let room = Room::new(room_id, config, self.oracle.clone(), self.updates.clone());
        self.rooms.write().await.insert(room_id, room.clone());
        tracing::info!(%room_id, public = room.is_public(), "room created");
        room
    }

    /// # Errors
    /// [`RoomError::RoomNotFound`] for an unknown or evicted room.
    pub async fn get(&self, room_id: RoomId) -> Result<Room<O>, RoomError> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(RoomError::RoomNotFound(room_id))
    }

    /// Handles to every live room, taken under a short read lock.
    async fn handles(&self) -> Vec<Room<O>> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// Metadata for every public room, ordered by room ID.
    pub async fn list_public(&self) -> Vec<RoomListEntry> {
        let mut entries = Vec::new();
        for room in self.handles().await.iter().filter(|room| room.is_public()) {
            entries.push(room.metadata().await);
        }
        entries.sort_by_key(|entry| entry.room_id.0);
        entries
    }

    /// Removes a room and cancels its timers.
    pub async fn destroy_room(&self, room_id: RoomId) -> Result<(), RoomError> {
        let room = self
            .rooms
            .write()
            .await
            .remove(&room_id)
            .ok_or(RoomError::RoomNotFound(room_id))?;
        room.teardown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Destroys every room nobody has touched for `idle_timeout`.
    /// Returns the evicted IDs.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> Vec<RoomId> {
        let mut idle = Vec::new();
        for room in self.handles().await {
            if room.last_touch().await.elapsed() >= idle_timeout {
                idle.push(room);
            }
        }

        let evicted: Vec<Room<O>> = {
            let mut rooms = self.rooms.write().await;
            idle.into_iter()
                .filter(|room| rooms.remove(&room.id()).is_some())
                .collect()
        };
        for room in &evicted {
            room.teardown().await;
            tracing::info!(room_id = %room.id(), "idle room evicted");
        }
        evicted.iter().map(Room::id).collect()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}
