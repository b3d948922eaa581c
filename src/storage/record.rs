//! Row frames
//!
//! `records.dat` is a sequence of frames:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, whole frame including this field)
//! +------------------+
//! | Row Payload      | (JSON array, one element per table column)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers the length field and the payload.

use serde_json::Value as Json;

use super::checksum::compute_checksum;
use super::errors::RecordFormatError;
use crate::record::Record;

/// Length field plus checksum
pub const FRAME_OVERHEAD: usize = 8;

/// Encodes a table row into a frame
pub fn encode_row(row: &Record) -> Result<Vec<u8>, RecordFormatError> {
    let payload = serde_json::to_vec(&row.to_json())?;
    let frame_length = (FRAME_OVERHEAD + payload.len()) as u32;

    let mut frame = Vec::with_capacity(frame_length as usize);
    frame.extend_from_slice(&frame_length.to_le_bytes());
    frame.extend_from_slice(&payload);
    let checksum = compute_checksum(&frame);
    frame.extend_from_slice(&checksum.to_le_bytes());

    Ok(frame)
}

/// Reads the declared frame length from the first four bytes
pub fn frame_length(header: [u8; 4]) -> usize {
    u32::from_le_bytes(header) as usize
}

/// Decodes one frame, verifying its checksum.
///
/// Returns the raw row payload and the number of bytes consumed.
pub fn decode_frame(data: &[u8]) -> Result<(Json, usize), RecordFormatError> {
    if data.len() < FRAME_OVERHEAD {
        return Err(RecordFormatError::TooShort(data.len()));
    }

    let declared = frame_length([data[0], data[1], data[2], data[3]]);
    if declared < FRAME_OVERHEAD {
        return Err(RecordFormatError::TooShort(declared));
    }
    if declared > data.len() {
        return Err(RecordFormatError::Truncated {
            declared,
            available: data.len(),
        });
    }

    let body_end = declared - 4;
    let stored = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    let computed = compute_checksum(&data[..body_end]);
    if computed != stored {
        return Err(RecordFormatError::ChecksumMismatch { computed, stored });
    }

    let payload = serde_json::from_slice(&data[4..body_end])?;
    Ok((payload, declared))
}
