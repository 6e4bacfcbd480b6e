//! Client for a credential vault daemon.
//!
//! Secrets are fetched over a single long-lived connection that speaks
//! length-prefixed JSON RPC. Agents authenticate by signing a server
//! challenge with their Ed25519 key, and every secret handed out is covered
//! by a lease that the client releases when it closes.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix socket and TCP connection targets
//! - [`frame`]: Length-prefixed JSON framing
//! - [`client`]: Request multiplexing, authentication, session and lease management

/// Re-export transport types.
pub mod transport {
    pub use vaultwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vaultwire_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use vaultwire_client::*;
}

pub use vaultwire_client::{ClientConfig, ClientError, VaultClient};
