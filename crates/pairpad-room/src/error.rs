//! Error types for room operations.

use pairpad_protocol::RoomId;

/// Why a room operation was rejected.
///
/// Every variant is scoped to a single operation on a single room;
/// none of these is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room code does not name a live room.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room already has its maximum number of members.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Another member of the room already uses this name.
    #[error("name \"{0}\" is already taken in room {1}")]
    NameTaken(String, RoomId),

    /// The acting connection is not a member of the room.
    #[error("not a member of room {0}")]
    NotAMember(RoomId),

    /// Only the member holding the turn may edit the buffer.
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    /// A trimmed, non-empty display name is required.
    #[error("a display name is required")]
    InvalidName,
}
