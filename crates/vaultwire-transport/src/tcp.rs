use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::VaultStream;
use crate::target::Target;

/// Connect to a vault daemon over TCP.
pub async fn connect(host: &str, port: u16) -> Result<VaultStream> {
    let stream = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(|e| TransportError::Connect {
            target: Target::tcp(host, port),
            source: e,
        })?;
    stream.set_nodelay(true)?;
    debug!(host, port, "connected to tcp endpoint");
    Ok(VaultStream::from_tcp(stream))
}
