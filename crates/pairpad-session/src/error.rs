//! Error types for the session layer.

/// Errors surfaced to callers of [`SessionHandle`](crate::SessionHandle).
///
/// Operation-level rejections (room full, not your turn, ...) are not
/// errors here; they travel back to the client as `error` events. This
/// type only covers the service itself being gone.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The session service task has stopped; no commands can be delivered.
    #[error("session service is no longer running")]
    Closed,
}
