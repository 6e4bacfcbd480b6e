use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value;

use crate::error::{FrameError, Result};

/// Frame header: big-endian payload length (4) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Maximum payload size accepted from the wire: 4 MiB.
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Encode a value into a standalone frame.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_into(value, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a value into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────────────────┐
/// │ Length (4B BE) │ JSON payload (UTF-8)      │
/// │                │ (Length bytes)            │
/// └────────────────┴──────────────────────────┘
/// ```
pub fn encode_into<T: Serialize + ?Sized>(value: &T, dst: &mut BytesMut) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::FrameTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(&payload);
    Ok(())
}

/// Decode one frame from the front of `src`.
///
/// On success returns the parsed JSON value and the unconsumed remainder.
/// Incomplete input yields [`FrameError::IncompleteHeader`] or
/// [`FrameError::IncompleteBody`]; `src` itself is never modified.
pub fn decode(src: &[u8]) -> Result<(Value, &[u8])> {
    decode_with_limit(src, MAX_MESSAGE_SIZE)
}

/// Decode one frame with an explicit payload limit.
pub fn decode_with_limit(src: &[u8], max_message_size: usize) -> Result<(Value, &[u8])> {
    let Some((header, rest)) = src.split_first_chunk::<HEADER_SIZE>() else {
        return Err(FrameError::IncompleteHeader {
            available: src.len(),
        });
    };

    let payload_len = u32::from_be_bytes(*header) as usize;
    if payload_len > max_message_size {
        return Err(FrameError::FrameTooLarge {
            size: payload_len,
            max: max_message_size,
        });
    }

    if rest.len() < payload_len {
        return Err(FrameError::IncompleteBody {
            expected: payload_len,
            available: rest.len(),
        });
    }

    let (body, remainder) = rest.split_at(payload_len);
    let value = serde_json::from_slice(body)?;
    Ok((value, remainder))
}
