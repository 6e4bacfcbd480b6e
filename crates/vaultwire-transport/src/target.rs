use std::fmt;
use std::path::{Path, PathBuf};

/// Where the vault daemon is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Filesystem-path Unix domain socket.
    Unix(PathBuf),
    /// TCP host and port.
    Tcp { host: String, port: u16 },
}

impl Target {
    /// Create a Unix domain socket target.
    pub fn unix(path: impl AsRef<Path>) -> Self {
        Self::Unix(path.as_ref().to_path_buf())
    }

    /// Create a TCP target.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Unix(_) => "unix-domain-socket",
            Self::Tcp { .. } => "tcp",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp { host, port } => write!(f, "tcp:{host}:{port}"),
        }
    }
}
