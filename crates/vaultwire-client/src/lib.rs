//! Authenticated vault sessions over a single multiplexed connection.
//!
//! Layers, from the wire up: [`mux`] correlates concurrent requests with
//! responses, [`handshake`] proves the agent's identity with an Ed25519
//! signature, and [`client`] tracks the session and its credential leases.

pub mod client;
pub mod config;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod mux;
pub mod rpc;
pub mod vault_error;

pub use client::{Lease, VaultClient};
pub use config::{default_key_dir, default_socket_path, ClientConfig};
pub use error::{ClientError, Result};
pub use handshake::{authenticate, Handshake, HandshakeState, Session};
pub use keys::{default_key_path, load_signing_key, parse_signing_key};
pub use mux::Multiplexer;
pub use rpc::{Params, Request, Response};
pub use vault_error::{raise_on_error, ErrorCode, StructuredError, VaultError, WireError};
