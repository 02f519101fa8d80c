//! `Server` builder and accept loop.
//!
//! This is the entry point for running a Pairpad server. It ties the
//! layers together: transport → protocol → session.

use pairpad_protocol::JsonCodec;
use pairpad_room::RoomConfig;
use pairpad_session::{SessionHandle, SessionService};
use pairpad_transport::{Transport, WebSocketTransport};

use crate::PairpadError;
use crate::handler::handle_connection;

/// Builder for configuring and starting a Pairpad server.
///
/// # Example
///
/// ```rust,ignore
/// let server = Server::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the room budgets (mainly useful in tests).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Builds the server: binds the listener and spawns the session
    /// service with its background sweep.
    pub async fn build(self) -> Result<Server, PairpadError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let session = SessionService::spawn(self.room_config);
        Ok(Server { transport, session })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Pairpad server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct Server {
    transport: WebSocketTransport,
    session: SessionHandle,
}

impl Server {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Each connection gets its own handler task. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), PairpadError> {
        tracing::info!("Pairpad server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let session = self.session.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, session, JsonCodec).await
                        {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
