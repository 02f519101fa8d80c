//! Per-connection handler: intent decoding and event pumping.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Register an outbound event channel with the session service
//!   2. Spawn a writer task that drains that channel onto the socket
//!   3. Loop: receive frames → decode intents → forward to the service
//!   4. On any exit (close, error, disconnect intent) send the
//!      idempotent disconnect so the room side is cleaned up

use std::sync::Arc;

use pairpad_protocol::{ClientIntent, Codec};
use pairpad_session::SessionHandle;
use pairpad_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::PairpadError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    session: SessionHandle,
    codec: C,
) -> Result<(), PairpadError>
where
    C: Codec + Clone,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    session.register(conn_id, event_tx).await?;

    // The writer owns the outbound direction. It ends when the service
    // drops this connection's sender (on disconnect) or the socket dies.
    let conn = Arc::new(conn);
    let writer = {
        let conn = Arc::clone(&conn);
        let codec = codec.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::debug!(error = %e, "failed to encode event");
                        continue;
                    }
                };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        })
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let intent: ClientIntent = match codec.decode(&data) {
            Ok(intent) => intent,
            Err(e) => {
                // Garbage frames are dropped; the connection survives.
                tracing::debug!(%conn_id, error = %e, "failed to decode intent");
                continue;
            }
        };

        match intent {
            ClientIntent::CreateRoom { user_name } => {
                session.create_room(conn_id, user_name).await?;
            }
            ClientIntent::Join { room_id, user_name } => {
                session.join_room(conn_id, room_id, user_name).await?;
            }
            ClientIntent::GetRoomInfo { room_id } => {
                session.get_room_info(conn_id, room_id).await?;
            }
            ClientIntent::CodeChange { room_id, code } => {
                session.code_change(conn_id, room_id, code).await?;
            }
            ClientIntent::Disconnect => {
                tracing::debug!(%conn_id, "client sent disconnect");
                break;
            }
        }
    }

    // Every exit path funnels here: leave the room (idempotent) and
    // stop pumping events.
    let _ = session.disconnect(conn_id).await;
    writer.abort();
    Ok(())
}
