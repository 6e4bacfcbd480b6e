use crate::target::Target;

/// Errors that can occur while establishing or using a vault connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified target.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: Target,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: std::path::PathBuf,
        len: usize,
        max: usize,
    },

    /// Unix domain sockets are not available on this platform.
    #[error("unix domain sockets are not supported on this platform")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, TransportError>;
