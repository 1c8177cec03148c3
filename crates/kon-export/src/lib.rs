//! Kon Export - telemetry receiver for Kon agents.
//!
//! This crate:
//! - Accepts agent connections over QUIC and reads length-delimited protobuf
//!   frames from each unidirectional stream
//! - Validates samples and holds them in a bounded in-memory store
//! - Expires old samples on a timer
//! - Serves the stored samples over a JSON HTTP API
//!
//! ## Architecture
//!
//! ```text
//! QUIC uni stream → FrameReader → decode_frame → Processor → MetricStore
//!                                                               ↑    ↓
//!                                                      expiry sweeper  HTTP API
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod processor;
pub mod storage;

#[cfg(test)]
pub mod test_fixtures;

pub use config::ExportConfig;
pub use error::{ExportError, TransportError};
