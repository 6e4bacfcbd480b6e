use std::path::PathBuf;

use vaultwire_transport::Target;

use crate::error::{ClientError, Result};
use crate::keys::default_key_path;

const CONFIG_DIR: &str = ".vaultwire";
const SOCKET_FILE: &str = "vault.sock";
const KEY_DIR: &str = "keys";

/// Connection settings for [`crate::VaultClient`].
///
/// Either `socket_path` or both `host` and `port` select the daemon; with
/// neither set the default socket path is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Agent identity presented during authentication.
    pub agent_name: String,
    pub socket_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Explicit key file; overrides `key_dir`.
    pub key_path: Option<PathBuf>,
    /// Directory holding `<agent>.key` files.
    pub key_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent_name: String::new(),
            socket_path: None,
            host: None,
            port: None,
            key_path: None,
            key_dir: default_key_dir(),
        }
    }
}

impl ClientConfig {
    /// Config for `agent_name` with every other field defaulted.
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    /// Resolve the daemon address.
    pub fn target(&self) -> Result<Target> {
        match (&self.socket_path, &self.host, self.port) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ClientError::Config(
                "socket path and host/port are mutually exclusive".to_string(),
            )),
            (Some(path), None, None) => Ok(Target::unix(path)),
            (None, Some(host), Some(port)) => Ok(Target::tcp(host.clone(), port)),
            (None, Some(_), None) => Err(ClientError::Config("host given without port".to_string())),
            (None, None, Some(_)) => Err(ClientError::Config("port given without host".to_string())),
            (None, None, None) => Ok(Target::unix(default_socket_path())),
        }
    }

    /// Resolve the signing key file.
    pub fn key_file(&self) -> PathBuf {
        match &self.key_path {
            Some(path) => path.clone(),
            None => default_key_path(&self.key_dir, &self.agent_name),
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `$HOME/.vaultwire/vault.sock`
pub fn default_socket_path() -> PathBuf {
    home_dir().join(CONFIG_DIR).join(SOCKET_FILE)
}

/// `$HOME/.vaultwire/keys`
pub fn default_key_dir() -> PathBuf {
    home_dir().join(CONFIG_DIR).join(KEY_DIR)
}
