use bytes::{Buf, BytesMut};
use serde::Serialize;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{decode_with_limit, encode_into, MAX_MESSAGE_SIZE};
use crate::error::FrameError;

/// `tokio_util` codec for the vaultwire wire format.
///
/// Decodes into [`serde_json::Value`]; encodes anything `Serialize`.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    max_message_size: usize,
}

impl JsonCodec {
    /// Create a codec enforcing [`MAX_MESSAGE_SIZE`].
    pub fn new() -> Self {
        Self::with_max_message_size(MAX_MESSAGE_SIZE)
    }

    /// Create a codec with an explicit payload limit.
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonCodec {
    type Item = Value;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, FrameError> {
        let (value, consumed) = match decode_with_limit(src, self.max_message_size) {
            Ok((value, rest)) => (value, src.len() - rest.len()),
            Err(FrameError::IncompleteBody { expected, available }) => {
                src.reserve(expected - available);
                return Ok(None);
            }
            Err(err) if err.is_incomplete() => return Ok(None),
            Err(err) => return Err(err),
        };
        src.advance(consumed);
        trace!(consumed, "decoded frame");
        Ok(Some(value))
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec {
    type Error = FrameError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_into(&item, dst)
    }
}
