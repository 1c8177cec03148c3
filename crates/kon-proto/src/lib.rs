//! Wire protocol types for Kon agent telemetry.
//!
//! Agents push samples to the exporter over QUIC unidirectional streams. Each
//! stream carries a sequence of length-delimited frames, and each frame holds
//! one protobuf message in one of two shapes:
//!
//! - [`BatchMetricsRequest`]: many samples sharing one agent identifier
//! - [`Metric`]: a single sample with no agent identifier
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────┐
//! │ Payload Length (4)   │  protobuf payload (Length bytes)     │
//! │ u32, big-endian      │  BatchMetricsRequest | Metric        │
//! └──────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! The two payload shapes carry no discriminant. [`decode_frame`] tries the
//! batch shape first and falls back to the single shape, which is the
//! behaviour existing senders rely on.
//!
//! # Example
//!
//! ```
//! use kon_proto::{decode_frame, encode_message, DecodedFrame, Metric, MetricType};
//!
//! let metric = Metric {
//!     name: "cpu.usage".into(),
//!     value: 42.5,
//!     timestamp: 1_704_067_200_000,
//!     r#type: MetricType::CpuUsage as i32,
//!     ..Default::default()
//! };
//! let frame = encode_message(&metric).unwrap();
//! let decoded = decode_frame(&frame[kon_proto::FRAME_HEADER_SIZE..]).unwrap();
//! assert!(matches!(decoded, DecodedFrame::Single(m) if m.name == "cpu.usage"));
//! ```

pub mod codec;
mod decode;
mod error;
mod metric;

pub use codec::{encode_frame, encode_message, FrameReader, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
pub use decode::{decode_frame, DecodedFrame};
pub use error::{FrameDecodeError, FrameError};
pub use metric::{BatchMetricsRequest, Metric, MetricType};

/// ALPN protocol identifier negotiated by agents and the exporter.
pub const ALPN_PROTOCOL: &[u8] = b"kon-agent";
