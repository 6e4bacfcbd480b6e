//! Length-prefixed JSON message framing for the vaultwire protocol.
//!
//! Every message is framed with:
//! - A 4-byte big-endian payload length
//! - Exactly that many bytes of UTF-8 JSON
//!
//! A frame is never partially trusted: a value is only produced once the
//! whole frame has arrived.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod framed;

pub use buffer::FrameBuffer;
pub use codec::{decode, encode, encode_into, HEADER_SIZE, MAX_MESSAGE_SIZE};
pub use error::{FrameError, Result};
pub use framed::JsonCodec;
