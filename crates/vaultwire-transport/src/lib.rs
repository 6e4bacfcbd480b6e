//! Connection targets and async byte streams for the vaultwire client.
//!
//! The vault daemon listens on either:
//! - a Unix domain socket path (the default), or
//! - a TCP `host:port` pair.
//!
//! This is the lowest layer of vaultwire. Everything else builds on top of
//! the [`VaultStream`] type provided here.

pub mod error;
pub mod stream;
pub mod target;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::{connect, VaultStream};
pub use target::Target;
