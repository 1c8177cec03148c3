//! Kon Export binary entry point.
//!
//! Starts the exporter with:
//! - QUIC agent receiver (port 7843)
//! - HTTP query API (port 8080)
//! - Background expiry sweeper

use std::sync::Arc;

use kon_export::{
    api::{metrics_router, ApiState},
    ingest::{bind_endpoint, generate_self_signed, serve, server_config, StreamPipeline},
    processor::DefaultProcessor,
    storage::{start_expiry_sweeper, MemoryStore, MetricStore},
    ExportConfig,
};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ExportConfig::load_from(&path)?,
        None => ExportConfig::load()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kon_export={}", config.log.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        quic_addr = %config.server.quic_addr,
        http_addr = %config.server.http_addr,
        max_size = config.storage.max_size,
        expire_time_secs = config.storage.expire_time_secs,
        "Configuration loaded"
    );

    let store: Arc<dyn MetricStore> = Arc::new(MemoryStore::new(
        config.storage.max_size,
        config.storage.expire_time(),
    ));
    let pipeline = StreamPipeline::new(Arc::new(DefaultProcessor::new()), store.clone());
    let sweeper = start_expiry_sweeper(store.clone(), config.storage.sweep_interval());

    let credential = generate_self_signed()?;
    let endpoint = bind_endpoint(config.server.quic_addr, server_config(&credential)?)?;
    tracing::info!(addr = %endpoint.local_addr()?, "QUIC receiver listening");
    let quic_server = tokio::spawn(serve(endpoint.clone(), pipeline));

    let router = metrics_router(ApiState::new(store), config.server.request_timeout());
    let listener = tokio::net::TcpListener::bind(config.server.http_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP API listening");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "HTTP API server error");
    }

    tracing::info!("Closing QUIC endpoint");
    endpoint.close(0u32.into(), b"shutdown");
    endpoint.wait_idle().await;
    let _ = quic_server.await;

    sweeper.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
