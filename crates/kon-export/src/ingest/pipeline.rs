//! Per-stream ingestion: frames in, stored samples out.

use std::sync::Arc;

use kon_proto::{decode_frame, DecodedFrame, FrameError, FrameReader};
use tokio::io::AsyncRead;

use crate::processor::Processor;
use crate::storage::MetricStore;

/// Counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Frames read, including undecodable ones.
    pub frames: usize,
    /// Frames decoded as batches.
    pub batches: usize,
    /// Frames decoded as single samples.
    pub singles: usize,
    /// Frames that matched neither message shape.
    pub decode_failures: usize,
    /// Samples handed to the store.
    pub samples_written: usize,
    /// Samples that failed validation.
    pub samples_rejected: usize,
}

/// How a stream ended.
#[derive(Debug)]
pub enum StreamOutcome {
    /// The sender finished the stream on a frame boundary.
    ClosedClean(StreamStats),
    /// Reading stopped on a fatal framing or I/O error.
    ClosedError {
        stats: StreamStats,
        error: FrameError,
    },
}

impl StreamOutcome {
    #[must_use]
    pub const fn stats(&self) -> &StreamStats {
        match self {
            Self::ClosedClean(stats) | Self::ClosedError { stats, .. } => stats,
        }
    }

    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::ClosedClean(_))
    }
}

/// Drives frames from one stream through validation into the store.
///
/// Frames on a stream are handled strictly in order. A frame that fails to
/// decode is logged and skipped; only framing and I/O errors end the stream.
#[derive(Clone)]
pub struct StreamPipeline {
    processor: Arc<dyn Processor>,
    store: Arc<dyn MetricStore>,
}

impl StreamPipeline {
    pub fn new(processor: Arc<dyn Processor>, store: Arc<dyn MetricStore>) -> Self {
        Self { processor, store }
    }

    /// Read `reader` to completion.
    pub async fn run<R>(&self, stream_id: &str, reader: R) -> StreamOutcome
    where
        R: AsyncRead + Unpin,
    {
        let mut frames = FrameReader::new(reader);
        let mut stats = StreamStats::default();

        loop {
            match frames.next_frame().await {
                Ok(Some(frame)) => self.handle_frame(stream_id, &frame, &mut stats).await,
                Ok(None) => {
                    tracing::debug!(
                        stream_id,
                        frames = stats.frames,
                        written = stats.samples_written,
                        "Stream closed"
                    );
                    return StreamOutcome::ClosedClean(stats);
                }
                Err(error) => {
                    tracing::error!(
                        stream_id,
                        frames = stats.frames,
                        error = %error,
                        "Stream aborted"
                    );
                    return StreamOutcome::ClosedError { stats, error };
                }
            }
        }
    }

    async fn handle_frame(&self, stream_id: &str, frame: &[u8], stats: &mut StreamStats) {
        stats.frames += 1;

        match decode_frame(frame) {
            Ok(DecodedFrame::Batch(batch)) => {
                stats.batches += 1;
                let outcome = self.processor.process_batch_request(&batch);
                let accepted = outcome.accepted.len();
                stats.samples_rejected += outcome.rejected;
                stats.samples_written += accepted;

                tracing::debug!(
                    stream_id,
                    agent_id = %batch.agent_id,
                    frame_len = frame.len(),
                    accepted,
                    rejected = outcome.rejected,
                    "Received batch"
                );
                self.store.write(outcome.accepted).await;
            }
            Ok(DecodedFrame::Single(metric)) => {
                stats.singles += 1;
                match self.processor.process_single_metric("", &metric) {
                    Ok(processed) => {
                        stats.samples_written += 1;
                        tracing::debug!(
                            stream_id,
                            frame_len = frame.len(),
                            metric = %processed.name,
                            "Received metric"
                        );
                        self.store.write(vec![processed]).await;
                    }
                    Err(e) => {
                        stats.samples_rejected += 1;
                        tracing::warn!(
                            stream_id,
                            metric = %metric.name,
                            error = %e,
                            "Rejected metric"
                        );
                    }
                }
            }
            Err(e) => {
                stats.decode_failures += 1;
                tracing::warn!(
                    stream_id,
                    frame_len = frame.len(),
                    error = %e,
                    hex = %hex::encode(frame),
                    raw = %String::from_utf8_lossy(frame),
                    "Failed to decode frame"
                );
            }
        }
    }
}
