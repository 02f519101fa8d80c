//! A single editing session: ordered members, turn index, shared buffer.
//!
//! `Room` enforces the membership and turn invariants; it knows nothing
//! about timers or broadcasts. The session layer decides *when* to call
//! `advance_turn` (on a timer fire, at capacity); membership changes
//! here never rotate the turn, they only keep the index in range.

use std::time::{Duration, Instant};

use pairpad_protocol::RoomId;
use pairpad_transport::ConnectionId;

use crate::RoomError;

/// One participant: the connection they joined from and their display name.
///
/// Names are unique within a room (case-sensitive); connections are
/// unique globally, so either field identifies the member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// The transport connection this member speaks through.
    pub conn: ConnectionId,
    /// Trimmed display name, unique within the room.
    pub name: String,
}

/// Outcome of removing a connection from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The connection was not a member; nothing changed.
    NotMember,
    /// The member left and others remain.
    Remaining {
        /// Name of the departed member.
        name: String,
    },
    /// The last member left; the caller must tear the room down.
    Empty {
        /// Name of the departed member.
        name: String,
    },
}

/// An ephemeral two-party editing session.
///
/// Invariants, maintained by every mutating method:
/// - member names are unique (case-sensitive, pre-trimmed by the caller)
/// - `current_turn` indexes into `members` whenever `members` is non-empty
/// - the buffer only changes through [`apply_edit`](Self::apply_edit),
///   which requires the acting member to hold the turn
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    created_by: String,
    members: Vec<Member>,
    current_turn: usize,
    code: String,
    created_at: Instant,
    start_time_ms: u64,
    active: bool,
}

impl Room {
    /// Creates a room with its creator as the sole member.
    ///
    /// `start_time_ms` is the wall-clock creation timestamp (epoch ms)
    /// reported in snapshots; expiry math uses the monotonic clock.
    pub fn new(
        id: RoomId,
        creator_conn: ConnectionId,
        creator_name: String,
        start_time_ms: u64,
    ) -> Self {
        Self {
            id,
            created_by: creator_name.clone(),
            members: vec![Member {
                conn: creator_conn,
                name: creator_name,
            }],
            current_turn: 0,
            code: String::new(),
            created_at: Instant::now(),
            start_time_ms,
            active: true,
        }
    }

    // -- Accessors --------------------------------------------------------

    /// The room's join code.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Name of the member who created the room (kept even after they leave).
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// The shared buffer.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Wall-clock creation timestamp in epoch milliseconds.
    pub fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    /// `false` once expiry or teardown has been initiated; turn
    /// advancement is suppressed from then on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether the room has no members left.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members in turn-rotation (insertion) order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Display names in rotation order, for snapshots and broadcasts.
    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// Looks up the member speaking through `conn`.
    pub fn member_by_conn(&self, conn: ConnectionId) -> Option<&Member> {
        self.members.iter().find(|m| m.conn == conn)
    }

    /// Index of the member currently holding the turn.
    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    /// The member currently holding the turn, if the room is occupied.
    pub fn turn_holder(&self) -> Option<&Member> {
        self.members.get(self.current_turn)
    }

    // -- Membership -------------------------------------------------------

    /// Adds a member, validating capacity and name uniqueness.
    ///
    /// `max_members` comes from [`RoomConfig`](crate::RoomConfig); the
    /// caller arms the turn timer when this brings the room to capacity.
    pub fn join(
        &mut self,
        conn: ConnectionId,
        name: String,
        max_members: usize,
    ) -> Result<(), RoomError> {
        if self.members.len() >= max_members {
            return Err(RoomError::RoomFull(self.id.clone()));
        }
        if self.members.iter().any(|m| m.name == name) {
            return Err(RoomError::NameTaken(name, self.id.clone()));
        }
        self.members.push(Member { conn, name });
        Ok(())
    }

    /// Removes the member on `conn`, keeping the turn index valid.
    ///
    /// The index resets to 0 only when the removal leaves it out of
    /// range; departures never rotate the turn on their own.
    pub fn remove_conn(&mut self, conn: ConnectionId) -> Departure {
        let Some(idx) = self.members.iter().position(|m| m.conn == conn) else {
            return Departure::NotMember;
        };
        let name = self.members.remove(idx).name;

        if self.members.is_empty() {
            self.current_turn = 0;
            return Departure::Empty { name };
        }
        if self.current_turn >= self.members.len() {
            self.current_turn = 0;
        }
        Departure::Remaining { name }
    }

    // -- Turn and buffer --------------------------------------------------

    /// Replaces the buffer, if the member on `conn` holds the turn.
    pub fn apply_edit(
        &mut self,
        conn: ConnectionId,
        code: String,
    ) -> Result<(), RoomError> {
        let Some(idx) = self.members.iter().position(|m| m.conn == conn) else {
            return Err(RoomError::NotAMember(self.id.clone()));
        };
        if idx != self.current_turn {
            return Err(RoomError::NotYourTurn(self.members[idx].name.clone()));
        }
        self.code = code;
        Ok(())
    }

    /// Rotates the turn to the next member in insertion order.
    ///
    /// Returns the new holder, or `None` if the room is inactive or
    /// empty (a fire that raced teardown must change nothing).
    pub fn advance_turn(&mut self) -> Option<&Member> {
        if !self.active || self.members.is_empty() {
            return None;
        }
        self.current_turn = (self.current_turn + 1) % self.members.len();
        self.members.get(self.current_turn)
    }

    // -- Lifecycle --------------------------------------------------------

    /// Marks the room as expiring; further turn advancement is suppressed.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Whether the room has outlived `lifetime`.
    pub fn has_expired(&self, lifetime: Duration) -> bool {
        self.created_at.elapsed() >= lifetime
    }

    /// Time left before the room expires (zero once overdue).
    pub fn remaining_lifetime(&self, lifetime: Duration) -> Duration {
        lifetime.saturating_sub(self.created_at.elapsed())
    }
}

// =========================================================================
// Tests
// =========================================================================
