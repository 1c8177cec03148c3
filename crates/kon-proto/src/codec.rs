//! Length-prefixed frame encoding and stream reading.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FrameError;

/// Length prefix size in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Maximum frame payload size (10 MiB).
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Reads length-prefixed frames from a byte stream.
///
/// Each frame is a 4-byte big-endian payload length followed by exactly that
/// many payload bytes. A clean end of stream between frames yields `None`.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_frame_len: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader enforcing [`MAX_FRAME_SIZE`].
    pub fn new(inner: R) -> Self {
        Self::with_max_frame_len(inner, MAX_FRAME_SIZE)
    }

    /// Creates a reader with a custom payload ceiling.
    pub fn with_max_frame_len(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            max_frame_len,
        }
    }

    /// Returns the payload ceiling in bytes.
    #[must_use]
    pub const fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Reads the next frame payload.
    ///
    /// Returns `Ok(None)` when the stream ends exactly on a frame boundary.
    /// An oversized length prefix is rejected before any payload is read.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let mut filled = 0;
        while filled < FRAME_HEADER_SIZE {
            let n = self.inner.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(FrameError::TruncatedHeader { read: filled });
            }
            filled += n;
        }

        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_frame_len {
            return Err(FrameError::TooLarge {
                size: len,
                max: self.max_frame_len,
            });
        }

        let mut payload = BytesMut::zeroed(len);
        match self.inner.read_exact(&mut payload).await {
            Ok(_) => Ok(Some(payload.freeze())),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(FrameError::TruncatedPayload { expected: len })
            }
            Err(e) => Err(FrameError::Io(e)),
        }
    }

    /// Consumes the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Prefixes a payload with its big-endian length.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FrameError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    // MAX_FRAME_SIZE fits in a u32
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Encodes a protobuf message as a complete frame.
pub fn encode_message<M: prost::Message>(message: &M) -> Result<Bytes, FrameError> {
    encode_frame(&message.encode_to_vec())
}
