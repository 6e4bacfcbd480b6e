use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::Result;
use crate::target::Target;

/// A connected vault stream over either socket kind.
///
/// This is the fundamental I/O type returned by [`connect`].
/// It wraps either a Unix domain socket or a TCP stream.
pub struct VaultStream {
    inner: VaultStreamInner,
}

enum VaultStreamInner {
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
    Tcp(tokio::net::TcpStream),
}

/// Connect to the vault daemon at `target`.
pub async fn connect(target: &Target) -> Result<VaultStream> {
    match target {
        #[cfg(unix)]
        Target::Unix(path) => crate::uds::connect(path).await,
        #[cfg(not(unix))]
        Target::Unix(_) => Err(crate::error::TransportError::Unsupported),
        Target::Tcp { host, port } => crate::tcp::connect(host, *port).await,
    }
}

impl VaultStream {
    /// Create a VaultStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: tokio::net::UnixStream) -> Self {
        Self {
            inner: VaultStreamInner::Unix(stream),
        }
    }

    /// Create a VaultStream from a TCP stream.
    pub(crate) fn from_tcp(stream: tokio::net::TcpStream) -> Self {
        Self {
            inner: VaultStreamInner::Tcp(stream),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            VaultStreamInner::Unix(_) => "unix-domain-socket",
            VaultStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl AsyncRead for VaultStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            VaultStreamInner::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            VaultStreamInner::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for VaultStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            VaultStreamInner::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            VaultStreamInner::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            VaultStreamInner::Unix(stream) => Pin::new(stream).poll_flush(cx),
            VaultStreamInner::Tcp(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            VaultStreamInner::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            VaultStreamInner::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for VaultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn tcp_roundtrip_through_connect() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let mut stream = connect(&Target::tcp("127.0.0.1", port)).await.unwrap();
        assert_eq!(stream.transport_name(), "tcp");
        stream.write_all(b"hello").await.unwrap();
        let mut echoed = [0u8; 5];
        stream.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"hello");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused_reports_target() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect(&Target::tcp("127.0.0.1", port)).await.unwrap_err();
        assert!(err.to_string().contains(&format!("tcp:127.0.0.1:{port}")));
    }
}
