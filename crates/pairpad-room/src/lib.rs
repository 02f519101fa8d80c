//! Room state for Pairpad: membership, turn rotation, and the registry.
//!
//! Everything in this crate is a synchronous state machine: no tasks,
//! no timers, no sockets. The session layer owns a [`RoomRegistry`]
//! inside a single actor task and drives these types from there, which
//! is what makes them safe to keep lock-free.
//!
//! # Key types
//!
//! - [`Room`]: one editing session with ordered members, turn index, buffer
//! - [`RoomRegistry`]: live rooms keyed by collision-free short codes
//! - [`RoomConfig`]: fixed session budgets (lifetime, turn length, capacity)
//! - [`RoomError`]: why an operation was rejected

mod config;
mod error;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Departure, Member, Room};
