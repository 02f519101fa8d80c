//! The session service actor and its command surface.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use pairpad_protocol::{RoomId, ServerEvent, TimeRemaining};
use pairpad_room::{Departure, RoomConfig, RoomError, RoomRegistry};
use pairpad_timer::TimerSlot;
use pairpad_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::ServiceError;

/// Channel sender for delivering outbound events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Command channel depth. Intents, timer fires, and sweeps share it.
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Commands processed by the service, one at a time.
///
/// The first group carries client intents; the second group is
/// internal: timer fires and the sweep re-enter through the same
/// channel so they serialize with everything else.
enum Command {
    /// Associate an outbound event channel with a connection.
    Register {
        conn: ConnectionId,
        sender: EventSender,
    },
    /// Create a room with the caller as sole member.
    CreateRoom {
        conn: ConnectionId,
        user_name: String,
    },
    /// Join an existing room by code.
    Join {
        conn: ConnectionId,
        room_id: RoomId,
        user_name: String,
    },
    /// Request a metadata snapshot.
    GetRoomInfo {
        conn: ConnectionId,
        room_id: RoomId,
    },
    /// Replace the shared buffer (turn holder only).
    CodeChange {
        conn: ConnectionId,
        room_id: RoomId,
        code: String,
    },
    /// The connection left: leave its room and drop its event channel.
    Disconnect { conn: ConnectionId },

    /// A room's lifetime timer fired.
    RoomExpired(RoomId),
    /// A room's turn timer fired.
    TurnTick(RoomId),
    /// Periodic reclamation of expired or memberless rooms.
    Sweep,
    /// Stop the service task.
    Shutdown,
}

/// Handle to the running service. Cheap to clone; one per connection
/// handler plus one per internal timer task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn send(&self, cmd: Command) -> Result<(), ServiceError> {
        self.tx.send(cmd).await.map_err(|_| ServiceError::Closed)
    }

    /// Registers a connection's outbound event channel.
    ///
    /// Must happen before any intent from that connection, or its
    /// replies are dropped.
    pub async fn register(
        &self,
        conn: ConnectionId,
        sender: EventSender,
    ) -> Result<(), ServiceError> {
        self.send(Command::Register { conn, sender }).await
    }

    /// Creates a room with the caller as sole member.
    pub async fn create_room(
        &self,
        conn: ConnectionId,
        user_name: String,
    ) -> Result<(), ServiceError> {
        self.send(Command::CreateRoom { conn, user_name }).await
    }

    /// Joins an existing room.
    pub async fn join_room(
        &self,
        conn: ConnectionId,
        room_id: RoomId,
        user_name: String,
    ) -> Result<(), ServiceError> {
        self.send(Command::Join {
            conn,
            room_id,
            user_name,
        })
        .await
    }

    /// Requests a room snapshot, delivered as a `roomInfo` event.
    pub async fn get_room_info(
        &self,
        conn: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), ServiceError> {
        self.send(Command::GetRoomInfo { conn, room_id }).await
    }

    /// Submits a buffer edit.
    pub async fn code_change(
        &self,
        conn: ConnectionId,
        room_id: RoomId,
        code: String,
    ) -> Result<(), ServiceError> {
        self.send(Command::CodeChange {
            conn,
            room_id,
            code,
        })
        .await
    }

    /// Removes the connection from its room (if any) and forgets its
    /// event channel. Idempotent.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), ServiceError> {
        self.send(Command::Disconnect { conn }).await
    }

    /// Stops the service task. Pending timers are aborted when the
    /// service's slots drop.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.send(Command::Shutdown).await
    }
}

/// Both countdowns for one room. Dropping this aborts any pending fire,
/// so teardown cancels timers by removing the entry.
#[derive(Default)]
struct RoomTimers {
    lifetime: TimerSlot,
    turn: TimerSlot,
}

/// The single-writer actor owning all session state.
pub struct SessionService {
    config: RoomConfig,
    registry: RoomRegistry,
    timers: HashMap<RoomId, RoomTimers>,
    /// Outbound event channel per registered connection.
    connections: HashMap<ConnectionId, EventSender>,
    /// Which room each connection is in. A connection is in at most
    /// one room (key invariant).
    conn_rooms: HashMap<ConnectionId, RoomId>,
    rx: mpsc::Receiver<Command>,
    /// Kept for arming timers: fires re-enter through this sender.
    tx: mpsc::Sender<Command>,
}

impl SessionService {
    /// Spawns the service task plus its background sweep and returns a
    /// handle for connection handlers.
    pub fn spawn(config: RoomConfig) -> SessionHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let sweep_interval = config.sweep_interval;

        let service = Self {
            config,
            registry: RoomRegistry::new(),
            timers: HashMap::new(),
            connections: HashMap::new(),
            conn_rooms: HashMap::new(),
            rx,
            tx: tx.clone(),
        };
        tokio::spawn(service.run());

        // The sweep shares the command channel, so reclamation is
        // serialized with every other mutation. It exits once the
        // service stops accepting commands.
        let sweep_tx = tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await; // first tick resolves immediately
            loop {
                ticker.tick().await;
                if sweep_tx.send(Command::Sweep).await.is_err() {
                    break;
                }
            }
        });

        SessionHandle { tx }
    }

    async fn run(mut self) {
        tracing::info!("session service started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Register { conn, sender } => {
                    self.connections.insert(conn, sender);
                }
                Command::CreateRoom { conn, user_name } => {
                    self.handle_create(conn, user_name);
                }
                Command::Join {
                    conn,
                    room_id,
                    user_name,
                } => {
                    self.handle_join(conn, room_id, user_name);
                }
                Command::GetRoomInfo { conn, room_id } => {
                    self.handle_get_info(conn, room_id);
                }
                Command::CodeChange {
                    conn,
                    room_id,
                    code,
                } => {
                    self.handle_edit(conn, room_id, code);
                }
                Command::Disconnect { conn } => {
                    self.leave(conn);
                    self.connections.remove(&conn);
                }
                Command::RoomExpired(room_id) => {
                    self.handle_room_expired(room_id);
                }
                Command::TurnTick(room_id) => {
                    self.handle_turn_tick(room_id);
                }
                Command::Sweep => {
                    self.handle_sweep();
                }
                Command::Shutdown => break,
            }
        }

        tracing::info!("session service stopped");
    }

    // -- Facade operations ------------------------------------------------

    fn handle_create(&mut self, conn: ConnectionId, user_name: String) {
        let name = user_name.trim().to_string();
        if name.is_empty() {
            self.reject(conn, &RoomError::InvalidName);
            return;
        }

        // One room per connection: creating evicts from any prior room.
        self.leave(conn);

        let room_id = self.registry.allocate(
            self.config.id_length,
            conn,
            name.clone(),
            epoch_millis(),
        );

        let mut timers = RoomTimers::default();
        let tx = self.tx.clone();
        let fire_id = room_id.clone();
        timers.lifetime.arm(self.config.room_lifetime, async move {
            let _ = tx.send(Command::RoomExpired(fire_id)).await;
        });
        self.timers.insert(room_id.clone(), timers);
        self.conn_rooms.insert(conn, room_id.clone());

        tracing::info!(room_id = %room_id, creator = %name, "room created");
        self.send_to(
            conn,
            ServerEvent::RoomCreated {
                room_id: room_id.clone(),
                message: format!("Room {room_id} created"),
                creator: name,
            },
        );
        self.broadcast_update(&room_id);
    }

    fn handle_join(&mut self, conn: ConnectionId, room_id: RoomId, user_name: String) {
        let name = user_name.trim().to_string();
        if name.is_empty() {
            self.reject(conn, &RoomError::InvalidName);
            return;
        }
        if !self.registry.contains(&room_id) {
            self.reject(conn, &RoomError::NotFound(room_id));
            return;
        }

        // Evict from a *different* prior room before joining; a failed
        // join below must leave all membership untouched, so this only
        // runs once the target room is known to exist.
        let in_other_room = self
            .conn_rooms
            .get(&conn)
            .is_some_and(|current| *current != room_id);
        if in_other_room {
            self.leave(conn);
        }

        let max_members = self.config.max_members;
        let Some(room) = self.registry.get_mut(&room_id) else {
            // Unreachable: eviction above cannot remove the target room.
            self.reject(conn, &RoomError::NotFound(room_id));
            return;
        };

        if let Err(err) = room.join(conn, name.clone(), max_members) {
            self.reject(conn, &err);
            return;
        }
        let users = room.member_names();
        let at_capacity = room.member_count() == max_members;
        self.conn_rooms.insert(conn, room_id.clone());

        tracing::info!(
            room_id = %room_id,
            user = %name,
            members = users.len(),
            "member joined"
        );

        if at_capacity {
            self.arm_turn_timer(&room_id);
        }

        self.broadcast(
            &room_id,
            ServerEvent::JoinedRoom {
                room_id: room_id.clone(),
                message: format!("{name} joined the room"),
                users,
            },
        );
        self.broadcast_update(&room_id);
    }

    fn handle_get_info(&mut self, conn: ConnectionId, room_id: RoomId) {
        let Some(room) = self.registry.get(&room_id) else {
            self.reject(conn, &RoomError::NotFound(room_id));
            return;
        };
        let event = ServerEvent::RoomInfo {
            room_id: room_id.clone(),
            users: room.member_names(),
            user_count: room.member_count(),
            max_users: self.config.max_members,
            created_by: room.created_by().to_string(),
            start_time: room.start_time_ms(),
            is_active: room.is_active(),
        };
        self.send_to(conn, event);
    }

    fn handle_edit(&mut self, conn: ConnectionId, room_id: RoomId, code: String) {
        let Some(room) = self.registry.get_mut(&room_id) else {
            // Stale client editing a dead room: idempotent cleanup
            // territory, so no error event.
            tracing::debug!(%conn, room_id = %room_id, "edit for unknown room dropped");
            return;
        };

        match room.apply_edit(conn, code.clone()) {
            Ok(()) => {
                self.broadcast_except(&room_id, conn, ServerEvent::CodeUpdate { code });
            }
            Err(RoomError::NotAMember(_)) => {
                tracing::debug!(%conn, room_id = %room_id, "edit from non-member dropped");
            }
            Err(err) => self.reject(conn, &err),
        }
    }

    /// The leave path shared by explicit disconnects and eviction.
    /// A connection that is in no room is a silent no-op.
    fn leave(&mut self, conn: ConnectionId) {
        let Some(room_id) = self.conn_rooms.remove(&conn) else {
            return;
        };
        let departure = match self.registry.get_mut(&room_id) {
            Some(room) => room.remove_conn(conn),
            None => return,
        };

        match departure {
            Departure::NotMember => {}
            Departure::Empty { name } => {
                tracing::info!(room_id = %room_id, user = %name, "last member left");
                self.teardown(&room_id, None);
            }
            Departure::Remaining { name } => {
                tracing::info!(room_id = %room_id, user = %name, "member left");
                // Below capacity the rotation goes dormant; the sole
                // remaining member holds the turn until someone joins.
                if let Some(timers) = self.timers.get_mut(&room_id) {
                    timers.turn.cancel();
                }
                self.broadcast_update(&room_id);
            }
        }
    }

    // -- Timer fires and sweep --------------------------------------------

    fn handle_turn_tick(&mut self, room_id: RoomId) {
        // Re-fetch by id: the fire may have raced teardown or a leave.
        let max_members = self.config.max_members;
        let Some(room) = self.registry.get_mut(&room_id) else {
            tracing::debug!(room_id = %room_id, "turn fire for dead room defused");
            return;
        };
        if !room.is_active() || room.member_count() < max_members {
            // Dormant: do not rotate, do not re-arm.
            return;
        }

        let holder = room.advance_turn().map(|m| m.name.clone());
        tracing::debug!(
            room_id = %room_id,
            player = holder.as_deref().unwrap_or(""),
            "turn rotated"
        );

        self.broadcast_update(&room_id);
        self.arm_turn_timer(&room_id);
    }

    fn handle_room_expired(&mut self, room_id: RoomId) {
        if !self.registry.contains(&room_id) {
            tracing::debug!(room_id = %room_id, "expiry fire for dead room defused");
            return;
        }
        self.expire(&room_id);
    }

    fn handle_sweep(&mut self) {
        // Second line of defense behind the per-room timers: reclaim
        // anything overdue or memberless that a lost fire left behind.
        for room_id in self.registry.expired_ids(self.config.room_lifetime) {
            tracing::info!(room_id = %room_id, "sweep reclaiming expired room");
            self.expire(&room_id);
        }
        for room_id in self.registry.empty_ids() {
            tracing::info!(room_id = %room_id, "sweep reclaiming empty room");
            self.teardown(&room_id, None);
        }
    }

    // -- Teardown ---------------------------------------------------------

    fn expire(&mut self, room_id: &RoomId) {
        if let Some(room) = self.registry.get_mut(room_id) {
            room.deactivate();
        }
        tracing::info!(room_id = %room_id, "room expired");
        self.teardown(
            room_id,
            Some(ServerEvent::RoomExpired {
                message: "Session time is up: the room has expired".to_string(),
            }),
        );
    }

    /// Cancels both timers, removes the room, clears the connection
    /// index, and optionally notifies the former members.
    ///
    /// Idempotent: a second invocation for the same id (sweep racing
    /// the lifetime fire) finds nothing and returns.
    fn teardown(&mut self, room_id: &RoomId, notify: Option<ServerEvent>) {
        // Timers first: no fire may be pending once the room is gone.
        self.timers.remove(room_id);

        let Some(room) = self.registry.remove(room_id) else {
            return;
        };

        for member in room.members() {
            self.conn_rooms.remove(&member.conn);
            if let Some(event) = &notify {
                self.send_to(member.conn, event.clone());
            }
        }
        tracing::info!(room_id = %room_id, "room torn down");
    }

    // -- Timer arming -----------------------------------------------------

    /// Arms the turn timer if it isn't already ticking. Idempotent so
    /// repeated capacity checks can call it blindly.
    fn arm_turn_timer(&mut self, room_id: &RoomId) {
        let Some(timers) = self.timers.get_mut(room_id) else {
            return;
        };
        if timers.turn.is_armed() {
            return;
        }
        let tx = self.tx.clone();
        let fire_id = room_id.clone();
        timers.turn.arm(self.config.turn_duration, async move {
            let _ = tx.send(Command::TurnTick(fire_id)).await;
        });
    }

    // -- Event delivery ---------------------------------------------------

    /// Sends an event to a single connection. Silently drops if the
    /// connection's channel is gone.
    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.connections.get(&conn) {
            let _ = sender.send(event);
        }
    }

    /// Sends an event to every member of a room.
    fn broadcast(&self, room_id: &RoomId, event: ServerEvent) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        for member in room.members() {
            self.send_to(member.conn, event.clone());
        }
    }

    /// Sends an event to every member of a room except one connection.
    fn broadcast_except(
        &self,
        room_id: &RoomId,
        excluded: ConnectionId,
        event: ServerEvent,
    ) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        for member in room.members() {
            if member.conn != excluded {
                self.send_to(member.conn, event.clone());
            }
        }
    }

    /// Broadcasts the full room state with both countdowns.
    fn broadcast_update(&self, room_id: &RoomId) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        let timers = self.timers.get(room_id);
        let time_remaining = TimeRemaining {
            room: timers
                .and_then(|t| t.lifetime.remaining())
                .unwrap_or_else(|| room.remaining_lifetime(self.config.room_lifetime))
                .as_secs(),
            turn: timers
                .and_then(|t| t.turn.remaining())
                .map(|d| d.as_secs()),
        };

        let event = ServerEvent::RoomUpdate {
            room_id: room_id.clone(),
            users: room.member_names(),
            current_turn: room.current_turn(),
            current_player: room.turn_holder().map(|m| m.name.clone()),
            code: room.code().to_string(),
            time_remaining,
        };
        for member in room.members() {
            self.send_to(member.conn, event.clone());
        }
    }

    /// Rejects an operation: debug log plus an `error` event to the
    /// originating connection only. Room state is never touched here.
    fn reject(&self, conn: ConnectionId, err: &RoomError) {
        tracing::debug!(%conn, error = %err, "operation rejected");
        self.send_to(
            conn,
            ServerEvent::Error {
                message: err.to_string(),
            },
        );
    }
}

/// Wall-clock creation timestamp for room snapshots.
fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
