use std::path::PathBuf;

use crate::vault_error::VaultError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No live connection when a call was attempted.
    #[error("not connected to vault")]
    NotConnected,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] vaultwire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] vaultwire_frame::FrameError),

    /// Authentication handshake failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The signing key file could not be read.
    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The daemon answered with an error.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection closed or failed while a call was outstanding.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// The daemon sent a well-formed frame with unexpected contents.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &str {
        match self {
            ClientError::NotConnected => "NOT_CONNECTED",
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::Frame(_) => "FRAME_ERROR",
            ClientError::Auth(_) | ClientError::KeyFile { .. } => "AUTH_ERROR",
            ClientError::Vault(err) => &err.code,
            ClientError::Json(_) | ClientError::Protocol(_) => "PROTOCOL_ERROR",
            ClientError::Disconnected(_) => "DISCONNECTED",
            ClientError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// The server-declared error, if this is one.
    pub fn as_vault(&self) -> Option<&VaultError> {
        match self {
            ClientError::Vault(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
