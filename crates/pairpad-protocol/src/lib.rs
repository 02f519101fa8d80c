//! Wire protocol for Pairpad.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`ClientIntent`], [`ServerEvent`], [`RoomId`], etc.):
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw frames) and session
//! (room state). It doesn't know about connections or rooms; it only
//! knows how to serialize and deserialize messages.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientIntent, RoomId, ServerEvent, TimeRemaining};
