//! COBS (Consistent Overhead Byte Stuffing) framing
//!
//! Encodes data so 0x00 never appears in the body, allowing it as the chunk
//! delimiter on the serial stream. Both directions work into caller-provided
//! buffers so the hot path allocates nothing per chunk.

use super::FrameFault;

/// Chunk delimiter on the wire
pub const DELIMITER: u8 = 0x00;

/// Stuff `data` into `output`, appending the trailing delimiter
///
/// Clears `output` first. The encoded body never contains 0x00; the final
/// byte is always the delimiter.
pub fn stuff(data: &[u8], output: &mut Vec<u8>) {
    output.clear();
    output.reserve(data.len() + (data.len() / 254) + 2);

    let mut code_index = 0;
    output.push(0);
    let mut code: u8 = 1;

    for &byte in data {
        if byte == 0 {
            output[code_index] = code;
            code_index = output.len();
            output.push(0);
            code = 1;
        } else {
            output.push(byte);
            code += 1;
            if code == 255 {
                output[code_index] = code;
                code_index = output.len();
                output.push(0);
                code = 1;
            }
        }
    }

    output[code_index] = code;
    output.push(DELIMITER);
}

/// Reverse the stuffing transform
///
/// `chunk` must NOT include the trailing delimiter. Clears `output` before
/// writing. A zero code byte or a group running past the end of the chunk is
/// an [`FrameFault::InvalidStuffing`].
pub fn unstuff(chunk: &[u8], output: &mut Vec<u8>) -> Result<(), FrameFault> {
    output.clear();

    let mut i = 0;
    while i < chunk.len() {
        let code = chunk[i] as usize;
        if code == 0 {
            return Err(FrameFault::InvalidStuffing);
        }

        i += 1;
        let copy_len = code - 1;

        if i + copy_len > chunk.len() {
            return Err(FrameFault::InvalidStuffing);
        }

        output.extend_from_slice(&chunk[i..i + copy_len]);
        i += copy_len;

        if code < 255 && i < chunk.len() {
            output.push(0);
        }
    }

    Ok(())
}
