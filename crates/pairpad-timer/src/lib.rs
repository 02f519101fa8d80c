//! Cancelable one-shot timer slots for Pairpad rooms.
//!
//! Each room owns two delayed actions, the lifetime countdown and the
//! turn countdown, with strict single-occupancy: at most one live
//! timer per slot, re-arming cancels the predecessor, and cancellation
//! of a dead or empty slot is a safe no-op.
//!
//! A slot does not run room logic itself. The armed future typically
//! just pushes a command into the session service's channel, so the
//! fire is serialized with every other room mutation and the handler
//! can re-fetch the room by id and check liveness before acting:
//!
//! ```ignore
//! let tx = self.commands.clone();
//! let id = room_id.clone();
//! slot.arm(config.turn_duration, async move {
//!     let _ = tx.send(Command::TurnTick(id)).await;
//! });
//! ```
//!
//! Slots cancel themselves on drop, so tearing a room down is "drop its
//! slots", and no exit path can leak a pending fire.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::trace;

// ---------------------------------------------------------------------------
// TimerSlot
// ---------------------------------------------------------------------------

/// A slot holding at most one pending delayed action.
///
/// States: *dormant* (nothing scheduled, or the last fire completed)
/// and *armed* (a fire is pending at a known deadline).
#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
}

impl TimerSlot {
    /// Creates an empty, dormant slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `on_fire` to run after `delay`, canceling any timer
    /// previously armed in this slot.
    ///
    /// The cancel-first rule is what prevents two live timers racing on
    /// the same room when a slot is re-armed on every membership change.
    pub fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let deadline = Instant::now() + delay;
        self.deadline = Some(deadline);
        self.handle = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            on_fire.await;
        }));
        trace!(delay_ms = delay.as_millis() as u64, "timer slot armed");
    }

    /// Cancels the pending fire, if any.
    ///
    /// Safe to call on a dormant slot and on a slot whose timer already
    /// fired; both are no-ops. Cancellation prevents a *future* fire:
    /// an action already dispatched into a command channel still arrives
    /// and must be defused by the receiver's liveness check.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            trace!("timer slot canceled");
        }
        self.deadline = None;
    }

    /// Whether a fire is currently pending.
    ///
    /// `false` once the armed future has run to completion, so a slot
    /// that fired and was not re-armed reads as dormant.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Time left until the pending fire, or `None` while dormant.
    ///
    /// Feeds the countdown fields in state broadcasts.
    pub fn remaining(&self) -> Option<Duration> {
        if !self.is_armed() {
            return None;
        }
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
