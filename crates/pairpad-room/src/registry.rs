//! Registry of live rooms, keyed by collision-free short codes.

use std::collections::HashMap;
use std::time::Duration;

use pairpad_protocol::RoomId;
use pairpad_transport::ConnectionId;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::Room;

/// Owns the mapping from room code to live [`Room`].
///
/// Not thread-safe on purpose: the session service owns one registry
/// inside its actor task and is the only writer, so a plain `HashMap`
/// is correct and lock-free.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh room with a code guaranteed unique among live
    /// rooms, the creator joined as sole member.
    ///
    /// Generation retries on collision rather than trusting the odds:
    /// 62^6 codes make a clash negligible, but the loop makes uniqueness
    /// an invariant instead of a probability. A code is only freed for
    /// reuse when its room is removed.
    pub fn allocate(
        &mut self,
        id_length: usize,
        creator_conn: ConnectionId,
        creator_name: String,
        start_time_ms: u64,
    ) -> RoomId {
        let id = loop {
            let candidate = generate_code(id_length);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(code = %candidate, "room code collision, retrying");
        };

        self.rooms.insert(
            id.clone(),
            Room::new(id.clone(), creator_conn, creator_name, start_time_ms),
        );
        id
    }

    /// Looks up a live room.
    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Looks up a live room for mutation.
    pub fn get_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    /// Removes a room, freeing its code for reuse.
    ///
    /// Returns `None` if the room was already gone, which makes
    /// teardown idempotent for callers that can race (lifetime timer
    /// vs. sweep).
    pub fn remove(&mut self, id: &RoomId) -> Option<Room> {
        self.rooms.remove(id)
    }

    /// Whether a room with this code is live.
    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Codes of all live rooms.
    pub fn ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    /// Codes of rooms that have outlived `lifetime`; sweep input.
    pub fn expired_ids(&self, lifetime: Duration) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|room| room.has_expired(lifetime))
            .map(|room| room.id().clone())
            .collect()
    }

    /// Codes of rooms with no members left; sweep input.
    ///
    /// The normal leave path tears empty rooms down immediately; this
    /// scan is the second line of defense.
    pub fn empty_ids(&self) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|room| room.is_empty())
            .map(|room| room.id().clone())
            .collect()
    }
}

/// Generates a random alphanumeric room code.
fn generate_code(len: usize) -> RoomId {
    let code: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect();
    RoomId::new(code)
}

// =========================================================================
// Tests
// =========================================================================
