//! Error types for the protocol.

use thiserror::Error;

/// Errors that terminate a frame stream.
///
/// Every variant is fatal to the stream it occurred on; the framing cannot
/// resynchronise once a length prefix or payload has been cut short.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Declared payload length exceeds the frame ceiling.
    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// Stream ended part-way through a length prefix.
    #[error("stream ended after {read} of 4 length prefix bytes")]
    TruncatedHeader { read: usize },

    /// Stream ended before the declared payload was complete.
    #[error("stream ended before {expected} byte payload was complete")]
    TruncatedPayload { expected: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns true if the stream was aborted for exceeding the size ceiling.
    #[must_use]
    pub const fn is_size_violation(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}

/// A frame payload that parses as neither message shape.
#[derive(Error, Debug, Clone)]
#[error("payload is neither a batch ({batch}) nor a single metric ({single})")]
pub struct FrameDecodeError {
    /// Error from the batch decode attempt.
    pub batch: prost::DecodeError,
    /// Error from the single metric decode attempt.
    pub single: prost::DecodeError,
}
