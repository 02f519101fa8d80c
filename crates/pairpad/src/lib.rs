//! # Pairpad
//!
//! A server for short-lived, two-party collaborative editing sessions.
//! Participants join a room by its six-character code, take turns
//! editing a shared text buffer on a fixed rotation, and the session
//! self-expires after its time budget.
//!
//! The heavy lifting happens in the sub-crates: `pairpad-session`
//! (the single-writer room/turn/timer coordinator), `pairpad-room`
//! (the state machine), `pairpad-timer`, `pairpad-protocol`, and
//! `pairpad-transport`. This crate ties them to a WebSocket listener.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pairpad::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PairpadError> {
//!     let server = Server::builder().bind("0.0.0.0:8080").build().await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::PairpadError;
pub use server::{Server, ServerBuilder};

/// The usual imports for embedding or running a Pairpad server.
pub mod prelude {
    pub use crate::{PairpadError, Server, ServerBuilder};
    pub use pairpad_protocol::{ClientIntent, RoomId, ServerEvent};
    pub use pairpad_room::RoomConfig;
}
