//! Interpretation of frame payloads.

use prost::Message;

use crate::error::FrameDecodeError;
use crate::metric::{BatchMetricsRequest, Metric};

/// A frame payload interpreted as one of the two message shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// Many samples from one agent.
    Batch(BatchMetricsRequest),
    /// One sample with no agent identifier.
    Single(Metric),
}

impl DecodedFrame {
    /// Number of samples carried by the frame.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        match self {
            Self::Batch(batch) => batch.metrics.len(),
            Self::Single(_) => 1,
        }
    }
}

/// Decodes a frame payload, trying the batch shape before the single shape.
///
/// The payloads carry no discriminant, so any bytes that parse as a batch are
/// treated as one. An empty payload is an empty batch.
pub fn decode_frame(payload: &[u8]) -> Result<DecodedFrame, FrameDecodeError> {
    let batch = match BatchMetricsRequest::decode(payload) {
        Ok(batch) => return Ok(DecodedFrame::Batch(batch)),
        Err(e) => e,
    };

    match Metric::decode(payload) {
        Ok(metric) => Ok(DecodedFrame::Single(metric)),
        Err(single) => Err(FrameDecodeError { batch, single }),
    }
}
