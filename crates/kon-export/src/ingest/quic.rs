//! QUIC accept loops.

use std::net::SocketAddr;

use quinn::{Connection, Endpoint};

use super::StreamPipeline;
use crate::error::TransportError;

/// Bind a server endpoint on `addr`.
pub fn bind_endpoint(
    addr: SocketAddr,
    config: quinn::ServerConfig,
) -> Result<Endpoint, TransportError> {
    Endpoint::server(config, addr).map_err(TransportError::Bind)
}

/// Accept connections until the endpoint is closed.
///
/// Handshake failures are logged and do not stop the loop.
pub async fn serve(endpoint: Endpoint, pipeline: StreamPipeline) {
    while let Some(incoming) = endpoint.accept().await {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let remote = incoming.remote_address();
            match incoming.await {
                Ok(connection) => handle_connection(connection, pipeline).await,
                Err(e) => tracing::warn!(%remote, error = %e, "QUIC handshake failed"),
            }
        });
    }

    tracing::info!("QUIC endpoint closed");
}

async fn handle_connection(connection: Connection, pipeline: StreamPipeline) {
    let remote = connection.remote_address();
    tracing::info!(%remote, "Agent connected");

    loop {
        let recv = match connection.accept_uni().await {
            Ok(recv) => recv,
            Err(e) => {
                tracing::info!(%remote, reason = %e, "Agent disconnected");
                return;
            }
        };

        let pipeline = pipeline.clone();
        let stream_id = format!("{remote}/{}", recv.id());
        tokio::spawn(async move {
            tracing::debug!(stream_id = %stream_id, "Stream opened");
            pipeline.run(&stream_id, recv).await;
        });
    }
}
