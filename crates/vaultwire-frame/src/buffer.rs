use bytes::{Buf, BytesMut};
use serde_json::Value;

use crate::codec::{decode_with_limit, MAX_MESSAGE_SIZE};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Receive buffer that turns arbitrary stream chunks into complete frames.
///
/// Chunks may hold several back-to-back frames or a fraction of one; any
/// trailing partial frame is kept for the next chunk.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    max_message_size: usize,
}

impl FrameBuffer {
    /// Create a buffer enforcing [`MAX_MESSAGE_SIZE`].
    pub fn new() -> Self {
        Self::with_max_message_size(MAX_MESSAGE_SIZE)
    }

    /// Create a buffer with an explicit payload limit.
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_message_size,
        }
    }

    /// Append a chunk of inbound bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered.
    ///
    /// Returns `Ok(None)` when only a partial frame (or nothing) remains.
    /// Errors other than "incomplete" are fatal for the stream.
    pub fn next_frame(&mut self) -> Result<Option<Value>> {
        let (value, consumed) = match decode_with_limit(&self.buf, self.max_message_size) {
            Ok((value, rest)) => (value, self.buf.len() - rest.len()),
            Err(err) if err.is_incomplete() => return Ok(None),
            Err(err) => return Err(err),
        };
        self.buf.advance(consumed);
        Ok(Some(value))
    }

    /// Append a chunk and drain every complete frame it finishes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Value>> {
        self.extend(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Number of buffered bytes not yet forming a complete frame.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;
    use serde_json::json;

    use super::*;
    use crate::codec::{encode, encode_into};
    use crate::error::FrameError;

    #[test]
    fn single_chunk_single_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&encode(&json!({"id": 1})).unwrap()).unwrap();

        assert_eq!(frames, vec![json!({"id": 1})]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn back_to_back_frames_in_one_chunk() {
        let mut wire = BytesMut::new();
        encode_into(&json!({"id": 1}), &mut wire).unwrap();
        encode_into(&json!({"id": 2}), &mut wire).unwrap();
        encode_into(&json!({"id": 3}), &mut wire).unwrap();

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&wire).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], json!({"id": 3}));
        assert!(buffer.is_empty());
    }

    #[test]
    fn byte_by_byte_delivery() {
        let wire = encode(&json!({"id": 9, "result": {"ok": true}})).unwrap();
        let mut buffer = FrameBuffer::new();

        let mut decoded = Vec::new();
        for byte in wire.iter() {
            decoded.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(decoded, vec![json!({"id": 9, "result": {"ok": true}})]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn trailing_partial_frame_is_retained() {
        let mut wire = BytesMut::new();
        encode_into(&json!({"id": 1}), &mut wire).unwrap();
        let second = encode(&json!({"id": 2})).unwrap();
        wire.put_slice(&second[..3]);

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&wire).unwrap();
        assert_eq!(frames, vec![json!({"id": 1})]);
        assert_eq!(buffer.len(), 3);

        let frames = buffer.push(&second[3..]).unwrap();
        assert_eq!(frames, vec![json!({"id": 2})]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn oversized_frame_is_fatal() {
        let mut wire = BytesMut::new();
        wire.put_u32(1024);

        let mut buffer = FrameBuffer::with_max_message_size(16);
        let err = buffer.push(&wire).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 1024, max: 16 }));
    }

    #[test]
    fn clear_discards_partial_input() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(&[0, 0]);
        assert_eq!(buffer.len(), 2);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.next_frame().unwrap().is_none());
    }
}
