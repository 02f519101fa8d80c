//! Session coordination for Pairpad.
//!
//! The [`SessionService`] is a single Tokio task that exclusively owns
//! every room, every per-room timer slot, and the connection → room
//! index. All mutations (client intents, timer fires, the background
//! sweep) arrive as commands on one mpsc channel and are processed one
//! at a time, so no two mutations to the same room ever interleave and
//! no locks guard room state.
//!
//! Timer fires re-enter through the same channel and re-fetch their
//! room by id, so a fire that raced teardown finds nothing and defuses
//! itself instead of mutating a stale room.
//!
//! # Key types
//!
//! - [`SessionService`]: the actor; [`SessionService::spawn`] starts it
//! - [`SessionHandle`]: cloneable command sender for connection handlers
//! - [`EventSender`]: per-connection outbound event channel

mod error;
mod service;

pub use error::ServiceError;
pub use service::{EventSender, SessionHandle, SessionService};
