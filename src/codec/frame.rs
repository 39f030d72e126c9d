//! CAN frame type and its fixed wire layout
//!
//! Wire layout (6 header bytes + payload):
//!
//! ```text
//! byte 0    command << 4 | is_rtr << 2 | is_extended << 1 | is_error
//! bytes 1-4 arbitration id, u32 big-endian
//! byte 5    dlc (payload length, 0-8)
//! bytes 6.. payload, exactly dlc bytes
//! ```
//!
//! The 4-byte id is oversized relative to real 11/29-bit CAN ids; the
//! contract here is wire compatibility with the adapter firmware, not
//! CAN-bus correctness.

use super::FrameFault;
use std::fmt;

/// Fixed header length in bytes
pub const HEADER_LEN: usize = 6;

/// Maximum payload length of a CAN data frame
pub const MAX_DATA_LEN: usize = 8;

/// Command nibble of a normal data frame; nonzero values are reserved
/// by the adapter firmware for other frame kinds.
const COMMAND_DATA: u8 = 0x0;

/// A CAN frame as exchanged with the adapter board
///
/// Immutable once constructed. `dlc` always equals the payload length;
/// the constructor enforces it and decode slices exactly `dlc` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: u32,
    data: [u8; MAX_DATA_LEN],
    dlc: u8,
    is_rtr: bool,
    is_extended: bool,
    is_error: bool,
    command: u8,
}

impl CanFrame {
    /// Create a normal data frame
    ///
    /// Fails with [`FrameFault::PayloadTooLong`] if `data` exceeds 8 bytes.
    pub fn new(id: u32, data: &[u8]) -> Result<Self, FrameFault> {
        if data.len() > MAX_DATA_LEN {
            return Err(FrameFault::PayloadTooLong { len: data.len() });
        }

        let mut payload = [0u8; MAX_DATA_LEN];
        payload[..data.len()].copy_from_slice(data);

        Ok(Self {
            id,
            data: payload,
            dlc: data.len() as u8,
            is_rtr: false,
            is_extended: false,
            is_error: false,
            command: COMMAND_DATA,
        })
    }

    /// Mark as a remote transmission request
    pub fn with_rtr(mut self) -> Self {
        self.is_rtr = true;
        self
    }

    /// Mark as carrying an extended (29-bit) id
    pub fn with_extended(mut self) -> Self {
        self.is_extended = true;
        self
    }

    /// Mark as an error frame
    pub fn with_error(mut self) -> Self {
        self.is_error = true;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload slice, exactly `dlc` bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    pub fn is_rtr(&self) -> bool {
        self.is_rtr
    }

    pub fn is_extended(&self) -> bool {
        self.is_extended
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Command nibble; `0x0` for normal data frames
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Encode into `output` (cleared first)
    pub fn encode_into(&self, output: &mut Vec<u8>) {
        output.clear();
        output.reserve(HEADER_LEN + self.dlc as usize);

        output.push(
            self.command << 4
                | (self.is_rtr as u8) << 2
                | (self.is_extended as u8) << 1
                | self.is_error as u8,
        );
        output.extend_from_slice(&self.id.to_be_bytes());
        output.push(self.dlc);
        output.extend_from_slice(self.data());
    }

    /// Encode into a fresh buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.dlc as usize);
        self.encode_into(&mut out);
        out
    }

    /// Decode a frame from raw (unstuffed) bytes
    ///
    /// Reads the header, then slices exactly `dlc` payload bytes; anything
    /// past `6 + dlc` is ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameFault> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameFault::TruncatedHeader { got: bytes.len() });
        }

        let dlc = bytes[5];
        if dlc as usize > MAX_DATA_LEN {
            return Err(FrameFault::DlcOutOfRange { dlc });
        }

        let total = HEADER_LEN + dlc as usize;
        if bytes.len() < total {
            return Err(FrameFault::TruncatedPayload {
                needed: total,
                got: bytes.len(),
            });
        }

        let id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let mut frame = Self::new(id, &bytes[HEADER_LEN..total])?;
        frame.command = (bytes[0] & 0xF0) >> 4;
        frame.is_rtr = bytes[0] & 0x04 != 0;
        frame.is_extended = bytes[0] & 0x02 != 0;
        frame.is_error = bytes[0] & 0x01 != 0;
        Ok(frame)
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id=0x{:03X} dlc={} data=[", self.id, self.dlc)?;
        for (i, byte) in self.data().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "]")
    }
}
