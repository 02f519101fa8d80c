//! Wire types for Pairpad's JSON protocol.
//!
//! Every inbound intent and outbound event is an internally-tagged
//! object (`{"type": "...", ...}`) with camelCase field names, matching
//! what browser clients produce and expect.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A room's short join code: six alphanumeric characters.
///
/// Newtype over `String` so a room code can't be confused with other
/// strings (member names, buffer contents) in signatures, while still
/// serializing as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an already-generated code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

// ---------------------------------------------------------------------------
// Inbound intents
// ---------------------------------------------------------------------------

/// An intent sent by a client, carrying that connection's identity
/// implicitly (the transport knows which socket it arrived on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    /// Create a new room and join it as the sole member.
    CreateRoom { user_name: String },

    /// Join an existing room by its code.
    Join { room_id: RoomId, user_name: String },

    /// Request a metadata snapshot of a room.
    GetRoomInfo { room_id: RoomId },

    /// Replace the shared buffer. Only honored for the turn holder.
    CodeChange { room_id: RoomId, code: String },

    /// Leave whatever room this connection is in.
    Disconnect,
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Seconds left on the room's two countdowns.
///
/// `turn` is absent while the turn timer is dormant (fewer than two
/// members in the room).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    /// Seconds until the room expires.
    pub room: u64,
    /// Seconds until the turn rotates, if the turn timer is armed.
    pub turn: Option<u64>,
}

/// An event sent by the server, either to the originating connection
/// or broadcast to every member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// An operation was rejected. Sent to the originating connection only.
    Error { message: String },

    /// A room was created; the creator is its sole member.
    RoomCreated {
        room_id: RoomId,
        message: String,
        creator: String,
    },

    /// Someone joined a room. Broadcast to all members including the joiner.
    JoinedRoom {
        room_id: RoomId,
        message: String,
        users: Vec<String>,
    },

    /// Metadata snapshot, in reply to `getRoomInfo`.
    RoomInfo {
        room_id: RoomId,
        users: Vec<String>,
        user_count: usize,
        max_users: usize,
        created_by: String,
        start_time: u64,
        is_active: bool,
    },

    /// Full room state. Broadcast on membership change and turn rotation.
    RoomUpdate {
        room_id: RoomId,
        users: Vec<String>,
        current_turn: usize,
        current_player: Option<String>,
        code: String,
        time_remaining: TimeRemaining,
    },

    /// The buffer changed. Sent to every member except the editor.
    CodeUpdate { code: String },

    /// The room reached the end of its lifetime and was torn down.
    RoomExpired { message: String },
}

// =========================================================================
// Tests
// =========================================================================
