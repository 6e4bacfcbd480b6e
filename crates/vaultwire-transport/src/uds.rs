use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::VaultStream;
use crate::target::Target;

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
pub const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
pub const MAX_PATH_LEN: usize = 104;

/// Connect to a listening Unix domain socket.
pub async fn connect(path: impl AsRef<Path>) -> Result<VaultStream> {
    let path = path.as_ref();
    validate_path(path)?;

    let stream = tokio::net::UnixStream::connect(path)
        .await
        .map_err(|e| TransportError::Connect {
            target: Target::unix(path),
            source: e,
        })?;
    debug!(?path, "connected to unix domain socket");
    Ok(VaultStream::from_unix(stream))
}

fn validate_path(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}
