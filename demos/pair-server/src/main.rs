//! Runnable Pairpad server with console logging.
//!
//! Point two WebSocket clients at it and speak the JSON protocol:
//!
//! ```text
//! → {"type":"createRoom","userName":"Alice"}
//! ← {"type":"roomCreated","roomId":"a1B2c3",...}
//! → {"type":"join","roomId":"a1B2c3","userName":"Bob"}   (other client)
//! → {"type":"codeChange","roomId":"a1B2c3","code":"..."}
//! ```

use pairpad::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pairpad=info,pair_server=info".into()),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    let server = Server::builder().bind(&addr).build().await?;
    eprintln!("pair-server listening on {addr}");

    server.run().await?;
    Ok(())
}
