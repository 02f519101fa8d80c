//! Unified error type for the Pairpad server.

use pairpad_protocol::ProtocolError;
use pairpad_room::RoomError;
use pairpad_session::ServiceError;
use pairpad_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors
/// automatically, so server code deals with one type.
#[derive(Debug, thiserror::Error)]
pub enum PairpadError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The session service is gone.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let top: PairpadError = err.into();
        assert!(matches!(top, PairpadError::Transport(_)));
        assert!(top.to_string().contains("gone"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(pairpad_protocol::RoomId::from("abc123"));
        let top: PairpadError = err.into();
        assert!(matches!(top, PairpadError::Room(_)));
        assert!(top.to_string().contains("abc123"));
    }

    #[test]
    fn test_from_service_error() {
        let err = ServiceError::Closed;
        let top: PairpadError = err.into();
        assert!(matches!(top, PairpadError::Service(_)));
    }
}
