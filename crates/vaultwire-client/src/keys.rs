//! Agent signing keys.
//!
//! A key file holds the hex-encoded 32-byte Ed25519 seed of one agent.

use std::path::{Path, PathBuf};

use ed25519_dalek::{SigningKey, SECRET_KEY_LENGTH};
use tracing::debug;

use crate::error::{ClientError, Result};

/// File extension of agent key files.
pub const KEY_FILE_EXTENSION: &str = "key";

/// Default key file location for `agent_name` under `key_dir`.
pub fn default_key_path(key_dir: impl AsRef<Path>, agent_name: &str) -> PathBuf {
    key_dir
        .as_ref()
        .join(format!("{agent_name}.{KEY_FILE_EXTENSION}"))
}

/// Read and decode the signing key stored at `path`.
pub fn load_signing_key(path: impl AsRef<Path>) -> Result<SigningKey> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ClientError::KeyFile {
        path: path.to_path_buf(),
        source,
    })?;
    let key = parse_signing_key(&contents)?;
    debug!(?path, "loaded agent signing key");
    Ok(key)
}

/// Decode a hex-encoded seed into a signing key.
pub fn parse_signing_key(encoded: &str) -> Result<SigningKey> {
    let bytes = hex::decode(encoded.trim())
        .map_err(|err| ClientError::Auth(format!("key file is not valid hex: {err}")))?;
    let seed: [u8; SECRET_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        ClientError::Auth(format!(
            "invalid key length: {} bytes (expected {SECRET_KEY_LENGTH})",
            bytes.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&seed))
}
