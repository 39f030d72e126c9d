//! Wire codec for the adapter protocol
//!
//! Two layers, composed on both directions:
//! - [`frame`]: fixed-layout CAN frame encode/decode (6-byte header + payload)
//! - [`cobs`]: byte stuffing so `0x00` can delimit chunks on the stream
//!
//! [`stream`] ties them together: it buffers raw serial bytes, splits on the
//! delimiter and yields decoded events one at a time.

pub mod cobs;
pub mod frame;
pub mod stream;

pub use frame::CanFrame;
pub use stream::{FrameStream, StreamEvent};

use std::fmt;

/// Greeting datagram sent to the adapter during the handshake.
///
/// Already delimiter-terminated; written to the link as-is, not stuffed.
pub const GREETING_REQUEST: [u8; 3] = [0x02, 0x10, 0x00];

/// Unstuffed payload the adapter answers the greeting with.
pub const GREETING_REPLY: &[u8] = b"\x10HelloSLCAN";

/// Recoverable per-chunk decode fault
///
/// A fault means one chunk off the wire was unusable. The read loop drops the
/// chunk, counts the fault and keeps going; a fault never tears the loop down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFault {
    /// Stuffed chunk contains an invalid COBS code or a truncated group
    InvalidStuffing,
    /// Fewer bytes than the fixed frame header
    TruncatedHeader { got: usize },
    /// Header promised more payload bytes than the chunk carries
    TruncatedPayload { needed: usize, got: usize },
    /// Header dlc exceeds the 8-byte CAN payload limit
    DlcOutOfRange { dlc: u8 },
    /// Payload handed to the frame constructor exceeds 8 bytes
    PayloadTooLong { len: usize },
}

impl fmt::Display for FrameFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStuffing => write!(f, "Invalid COBS encoding"),
            Self::TruncatedHeader { got } => {
                write!(f, "Frame header truncated: {} bytes", got)
            }
            Self::TruncatedPayload { needed, got } => {
                write!(f, "Frame payload truncated: need {}, got {}", needed, got)
            }
            Self::DlcOutOfRange { dlc } => write!(f, "Frame dlc out of range: {}", dlc),
            Self::PayloadTooLong { len } => {
                write!(f, "Frame payload too long: {} bytes (max 8)", len)
            }
        }
    }
}

impl std::error::Error for FrameFault {}
