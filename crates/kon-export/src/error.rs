//! Error types for the exporter crate.

use std::io;

/// Errors that stop the exporter from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// QUIC transport setup error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors building the QUIC endpoint and its TLS credential.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Self-signed certificate generation failed.
    #[error("certificate generation failed: {0}")]
    Certificate(#[from] rcgen::Error),

    /// TLS configuration rejected.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// TLS configuration lacks a cipher suite usable for QUIC.
    #[error("TLS configuration unusable for QUIC: {0}")]
    NoInitialCipherSuite(#[from] quinn::crypto::rustls::NoInitialCipherSuite),

    /// Binding the UDP socket failed.
    #[error("failed to bind QUIC endpoint: {0}")]
    Bind(#[source] io::Error),
}
