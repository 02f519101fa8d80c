//! Integration tests for the session service.
//!
//! Everything runs under `tokio::time::pause()` (`start_paused`), so the
//! 30-minute lifetime and 5-minute turn budgets elapse instantly and
//! deterministically: sleeping past a deadline lets the armed timer
//! fire, re-enter the command channel, and be processed before the test
//! resumes.

use std::time::Duration;

use pairpad_protocol::{RoomId, ServerEvent};
use pairpad_room::RoomConfig;
use pairpad_session::{SessionHandle, SessionService};
use pairpad_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

struct TestClient {
    conn: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    /// Pulls every event delivered so far.
    fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Registers a fake connection with the service.
async fn client(handle: &SessionHandle, id: u64) -> TestClient {
    let conn = ConnectionId::new(id);
    let (tx, rx) = mpsc::unbounded_channel();
    handle.register(conn, tx).await.expect("service running");
    TestClient { conn, rx }
}

/// Lets the service task drain its command queue.
async fn settle() {
    for _ in 0..30 {
        tokio::task::yield_now().await;
    }
}

/// Sleeps past a deadline (auto-advancing the paused clock through any
/// pending timers) and lets the resulting commands be processed.
async fn advance_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    settle().await;
}

fn created_room_id(events: &[ServerEvent]) -> RoomId {
    events
        .iter()
        .find_map(|e| match e {
            ServerEvent::RoomCreated { room_id, .. } => Some(room_id.clone()),
            _ => None,
        })
        .expect("expected a roomCreated event")
}

fn has_error_containing(events: &[ServerEvent], needle: &str) -> bool {
    events.iter().any(|e| {
        matches!(e, ServerEvent::Error { message } if message.contains(needle))
    })
}

fn latest_update(events: &[ServerEvent]) -> Option<&ServerEvent> {
    events
        .iter()
        .rev()
        .find(|e| matches!(e, ServerEvent::RoomUpdate { .. }))
}

/// Creates a room as "Alice" and returns its id with the creation
/// events already drained.
async fn create_room(handle: &SessionHandle, alice: &mut TestClient) -> RoomId {
    handle
        .create_room(alice.conn, "Alice".into())
        .await
        .unwrap();
    settle().await;
    created_room_id(&alice.drain())
}

// =========================================================================
// Room creation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_create_room_yields_code_and_initial_state() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;

    handle
        .create_room(alice.conn, "  Alice  ".into())
        .await
        .unwrap();
    settle().await;

    let events = alice.drain();
    let room_id = created_room_id(&events);
    assert_eq!(room_id.as_str().len(), 6);
    assert!(room_id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));

    // The creator is the sole member and implicitly holds the turn;
    // the turn countdown is dormant below capacity.
    match latest_update(&events).expect("initial roomUpdate") {
        ServerEvent::RoomUpdate {
            users,
            current_turn,
            current_player,
            time_remaining,
            ..
        } => {
            assert_eq!(users, &["Alice".to_string()]);
            assert_eq!(*current_turn, 0);
            assert_eq!(current_player.as_deref(), Some("Alice"));
            assert!(time_remaining.room <= 1800);
            assert!(time_remaining.room > 1790);
            assert_eq!(time_remaining.turn, None);
        }
        _ => unreachable!(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_room_with_blank_name_rejected() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;

    handle.create_room(alice.conn, "   ".into()).await.unwrap();
    settle().await;

    let events = alice.drain();
    assert!(has_error_containing(&events, "display name"));
    assert_eq!(events.len(), 1, "no room may be created for a blank name");
}

#[tokio::test(start_paused = true)]
async fn test_creating_again_evicts_from_previous_room() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;

    let first = create_room(&handle, &mut alice).await;
    let second = create_room(&handle, &mut alice).await;
    assert_ne!(first, second);

    // The first room lost its only member and was torn down.
    handle.get_room_info(alice.conn, first).await.unwrap();
    settle().await;
    assert!(has_error_containing(&alice.drain(), "not found"));
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_broadcasts_to_both_members_and_arms_turn_timer() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id.clone(), "Bob".into())
        .await
        .unwrap();
    settle().await;

    for events in [alice.drain(), bob.drain()] {
        let joined = events
            .iter()
            .find(|e| matches!(e, ServerEvent::JoinedRoom { .. }))
            .expect("both members see the join");
        match joined {
            ServerEvent::JoinedRoom { users, .. } => {
                assert_eq!(users, &["Alice".to_string(), "Bob".to_string()]);
            }
            _ => unreachable!(),
        }
        match latest_update(&events).expect("state broadcast on join") {
            ServerEvent::RoomUpdate { time_remaining, .. } => {
                let turn = time_remaining.turn.expect("turn timer armed at capacity");
                assert!(turn <= 300);
            }
            _ => unreachable!(),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_join_unknown_room_rejected() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut bob = client(&handle, 2).await;

    handle
        .join_room(bob.conn, RoomId::from("nosuch"), "Bob".into())
        .await
        .unwrap();
    settle().await;

    assert!(has_error_containing(&bob.drain(), "not found"));
}

#[tokio::test(start_paused = true)]
async fn test_join_full_room_rejected_without_mutation() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;
    let mut carol = client(&handle, 3).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id.clone(), "Bob".into())
        .await
        .unwrap();
    handle
        .join_room(carol.conn, room_id.clone(), "Carol".into())
        .await
        .unwrap();
    settle().await;

    assert!(has_error_containing(&carol.drain(), "full"));

    handle
        .get_room_info(carol.conn, room_id.clone())
        .await
        .unwrap();
    settle().await;
    match carol.drain().first() {
        Some(ServerEvent::RoomInfo {
            users, user_count, ..
        }) => {
            assert_eq!(*user_count, 2);
            assert_eq!(users, &["Alice".to_string(), "Bob".to_string()]);
        }
        other => panic!("expected roomInfo, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_join_with_taken_name_rejected() {
    // Covers the preserved reconnect quirk: a fresh connection reusing
    // a live member's name is told the name is taken.
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut impostor = client(&handle, 9).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(impostor.conn, room_id, "Alice".into())
        .await
        .unwrap();
    settle().await;

    assert!(has_error_containing(&impostor.drain(), "taken"));
}

// =========================================================================
// Room info
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_room_info_snapshot_fields() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .get_room_info(alice.conn, room_id.clone())
        .await
        .unwrap();
    settle().await;

    match alice.drain().first() {
        Some(ServerEvent::RoomInfo {
            room_id: id,
            users,
            user_count,
            max_users,
            created_by,
            is_active,
            ..
        }) => {
            assert_eq!(id, &room_id);
            assert_eq!(users, &["Alice".to_string()]);
            assert_eq!(*user_count, 1);
            assert_eq!(*max_users, 2);
            assert_eq!(created_by, "Alice");
            assert!(is_active);
        }
        other => panic!("expected roomInfo, got {other:?}"),
    }
}

// =========================================================================
// Editing and turn rotation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pair_editing_scenario() {
    // The full two-party flow: create, join, turn-gated edits, one
    // rotation, then the other side edits.
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id.clone(), "Bob".into())
        .await
        .unwrap();
    settle().await;
    alice.drain();
    bob.drain();

    // Alice holds turn 0: her edit lands, and only Bob is notified.
    handle
        .code_change(alice.conn, room_id.clone(), "fn main() {}".into())
        .await
        .unwrap();
    settle().await;
    assert!(
        alice.drain().is_empty(),
        "the editor must not receive their own codeUpdate"
    );
    assert_eq!(
        bob.drain(),
        vec![ServerEvent::CodeUpdate {
            code: "fn main() {}".into()
        }]
    );

    // Bob edits before any rotation: rejected, buffer untouched.
    handle
        .code_change(bob.conn, room_id.clone(), "hijack".into())
        .await
        .unwrap();
    settle().await;
    assert!(has_error_containing(&bob.drain(), "turn"));
    assert!(alice.drain().is_empty());

    // One turn rotation.
    advance_secs(301).await;
    for events in [alice.drain(), bob.drain()] {
        match latest_update(&events).expect("rotation broadcast") {
            ServerEvent::RoomUpdate {
                current_turn,
                current_player,
                code,
                ..
            } => {
                assert_eq!(*current_turn, 1);
                assert_eq!(current_player.as_deref(), Some("Bob"));
                assert_eq!(code, "fn main() {}", "rejected edit must not stick");
            }
            _ => unreachable!(),
        }
    }

    // Now Bob holds the turn.
    handle
        .code_change(bob.conn, room_id.clone(), "// bob was here".into())
        .await
        .unwrap();
    settle().await;
    assert_eq!(
        alice.drain(),
        vec![ServerEvent::CodeUpdate {
            code: "// bob was here".into()
        }]
    );
    assert!(bob.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_turn_rotation_is_cyclic_over_two_fires() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id, "Bob".into())
        .await
        .unwrap();
    settle().await;
    alice.drain();

    advance_secs(301).await;
    match latest_update(&alice.drain()).expect("first rotation") {
        ServerEvent::RoomUpdate { current_player, .. } => {
            assert_eq!(current_player.as_deref(), Some("Bob"));
        }
        _ => unreachable!(),
    }

    advance_secs(300).await;
    match latest_update(&alice.drain()).expect("second rotation") {
        ServerEvent::RoomUpdate { current_player, .. } => {
            assert_eq!(current_player.as_deref(), Some("Alice"));
        }
        _ => unreachable!(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_edit_on_unknown_room_is_silent() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;

    handle
        .code_change(alice.conn, RoomId::from("nosuch"), "x".into())
        .await
        .unwrap();
    settle().await;

    assert!(alice.drain().is_empty(), "stale edits are dropped, not errors");
}

// =========================================================================
// Leaving and disconnects
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leave_resets_turn_and_parks_rotation() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id, "Bob".into())
        .await
        .unwrap();
    advance_secs(301).await; // Bob (index 1) now holds the turn
    alice.drain();

    handle.disconnect(bob.conn).await.unwrap();
    settle().await;

    match latest_update(&alice.drain()).expect("departure broadcast") {
        ServerEvent::RoomUpdate {
            users,
            current_turn,
            current_player,
            time_remaining,
            ..
        } => {
            assert_eq!(users, &["Alice".to_string()]);
            assert_eq!(*current_turn, 0, "out-of-range index resets to 0");
            assert_eq!(current_player.as_deref(), Some("Alice"));
            assert_eq!(time_remaining.turn, None, "turn timer goes dormant");
        }
        _ => unreachable!(),
    }

    // Dormant means dormant: no further rotation broadcasts arrive.
    advance_secs(700).await;
    assert!(
        !alice
            .drain()
            .iter()
            .any(|e| matches!(e, ServerEvent::RoomUpdate { .. })),
        "no turn fires may reach a below-capacity room"
    );
}

#[tokio::test(start_paused = true)]
async fn test_last_disconnect_tears_room_down_immediately() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;
    let mut observer = client(&handle, 3).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id.clone(), "Bob".into())
        .await
        .unwrap();
    settle().await;

    handle.disconnect(alice.conn).await.unwrap();
    handle.disconnect(bob.conn).await.unwrap();
    settle().await;

    // Torn down now, not when the lifetime timer would have fired.
    handle
        .get_room_info(observer.conn, room_id.clone())
        .await
        .unwrap();
    settle().await;
    assert!(has_error_containing(&observer.drain(), "not found"));

    // Both timers were canceled with the room: nothing fires later.
    advance_secs(3700).await;
    assert!(alice.drain().is_empty());
    assert!(bob.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_when_not_in_a_room_is_noop() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut carol = client(&handle, 3).await;

    handle.disconnect(carol.conn).await.unwrap();
    handle.disconnect(carol.conn).await.unwrap();
    settle().await;

    assert!(carol.drain().is_empty(), "idempotent cleanup never errors");
}

// =========================================================================
// Expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_room_expires_after_lifetime() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;

    let room_id = create_room(&handle, &mut alice).await;

    advance_secs(1801).await;

    let events = alice.drain();
    let expirations = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoomExpired { .. }))
        .count();
    // The lifetime fire and the sweep can race at the deadline; the
    // idempotent teardown must collapse them into a single broadcast.
    assert_eq!(expirations, 1, "exactly one roomExpired per room");

    handle.get_room_info(alice.conn, room_id).await.unwrap();
    settle().await;
    assert!(has_error_containing(&alice.drain(), "not found"));
}

#[tokio::test(start_paused = true)]
async fn test_expiry_reaches_both_members() {
    let handle = SessionService::spawn(RoomConfig::default());
    let mut alice = client(&handle, 1).await;
    let mut bob = client(&handle, 2).await;

    let room_id = create_room(&handle, &mut alice).await;
    handle
        .join_room(bob.conn, room_id, "Bob".into())
        .await
        .unwrap();
    settle().await;

    advance_secs(1801).await;

    for events in [alice.drain(), bob.drain()] {
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ServerEvent::RoomExpired { .. })),
            "every member learns the session ended"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweep_after_expiry_is_defused() {
    // Shrink the budgets so the lifetime fire (t=10s) and the first
    // sweep (t=60s) land at clearly distinct instants. The sweep finds
    // the room already gone and must neither error nor re-broadcast.
    let config = RoomConfig {
        room_lifetime: Duration::from_secs(10),
        sweep_interval: Duration::from_secs(60),
        ..RoomConfig::default()
    };
    let handle = SessionService::spawn(config);
    let mut alice = client(&handle, 1).await;

    let room_id = create_room(&handle, &mut alice).await;

    advance_secs(61).await;

    let events = alice.drain();
    let expirations = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoomExpired { .. }))
        .count();
    assert_eq!(expirations, 1, "the later sweep must not repeat the expiry");

    handle.get_room_info(alice.conn, room_id).await.unwrap();
    settle().await;
    assert!(has_error_containing(&alice.drain(), "not found"));
}
