//! Agent ingestion over QUIC.
//!
//! Each accepted connection and each unidirectional stream on it runs in its
//! own task. Streams share nothing but the store.

pub mod pipeline;
pub mod quic;
pub mod tls;

pub use pipeline::{StreamOutcome, StreamPipeline, StreamStats};
pub use quic::{bind_endpoint, serve};
pub use tls::{generate_self_signed, server_config, SelfSignedCert};
