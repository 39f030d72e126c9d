//! Streaming extraction of frames from the buffered serial byte stream
//!
//! The serial link delivers bytes in arbitrary slices. [`FrameStream`]
//! accumulates them, splits on the 0x00 delimiter, keeps the trailing
//! (possibly incomplete) fragment for the next feed, and turns each complete
//! chunk into a [`StreamEvent`] or a recoverable [`FrameFault`].
//!
//! The stream is logically infinite: it yields `None` only when the buffer
//! holds no complete chunk, and resumes as soon as more bytes arrive.

use super::{cobs, CanFrame, FrameFault, GREETING_REPLY};
use bytes::BytesMut;

/// Maximum bytes buffered before a forced flush (prevents memory exhaustion
/// if the adapter streams garbage with no delimiter)
const MAX_BUFFER_SIZE: usize = 16384;

/// One decoded item off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The adapter answered the handshake greeting. Consumed by the
    /// controller, never dispatched as a frame.
    HandshakeReply,
    /// A decoded CAN frame
    Frame(CanFrame),
}

/// Pull-based decoder over the buffered byte stream
pub struct FrameStream {
    buffer: BytesMut,
    scratch: Vec<u8>,
}

impl Default for FrameStream {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStream {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            scratch: Vec::with_capacity(64),
        }
    }

    /// Append freshly read bytes to the internal buffer
    ///
    /// Past the buffer cap, only the undelimited tail is discarded:
    /// complete chunks already buffered stay pullable, and growth without a
    /// delimiter stays bounded.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_BUFFER_SIZE {
            match self.buffer.iter().rposition(|&b| b == cobs::DELIMITER) {
                Some(pos) => self.buffer.truncate(pos + 1),
                None => self.buffer.clear(),
            }
        }
    }

    /// Bytes currently buffered (incomplete trailing fragment included)
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Iterator for FrameStream {
    type Item = Result<StreamEvent, FrameFault>;

    /// Pull the next complete chunk out of the buffer
    ///
    /// Returns `None` when no delimiter-terminated chunk is buffered yet.
    /// A fault consumes the offending chunk, so the caller can keep pulling.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let pos = self.buffer.iter().position(|&b| b == cobs::DELIMITER)?;
            let chunk = self.buffer.split_to(pos + 1);
            let body = &chunk[..pos];

            // Stray delimiter with no body
            if body.is_empty() {
                continue;
            }

            if let Err(fault) = cobs::unstuff(body, &mut self.scratch) {
                return Some(Err(fault));
            }

            if self.scratch == GREETING_REPLY {
                return Some(Ok(StreamEvent::HandshakeReply));
            }

            return Some(match CanFrame::decode(&self.scratch) {
                Ok(frame) => Ok(StreamEvent::Frame(frame)),
                Err(fault) => Err(fault),
            });
        }
    }
}
