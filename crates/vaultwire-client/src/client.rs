//! Session and lease management.
//!
//! [`VaultClient`] owns one authenticated connection plus the set of leases
//! it has been granted. Secrets come back hex-encoded and are decoded to
//! UTF-8 here; `use_credential` never receives a secret at all.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ed25519_dalek::SigningKey;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::handshake::{authenticate, Session};
use crate::keys::load_signing_key;
use crate::mux::Multiplexer;
use crate::rpc::{self, Params, METHOD_LIST, METHOD_RELEASE_LEASE, METHOD_RETRIEVE, METHOD_USE};

/// A credential lease granted by the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub lease_id: String,
    /// Credential path the lease was granted for.
    pub path: String,
    /// Lifetime in seconds, if the vault reported or was asked for one.
    pub ttl: Option<u64>,
}

/// Authenticated client for the vault daemon.
#[derive(Debug)]
pub struct VaultClient {
    mux: Multiplexer,
    session: Option<Session>,
    leases: Mutex<HashMap<String, Lease>>,
}

impl VaultClient {
    /// Connect to the daemon named by `config` and authenticate.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let target = config.target()?;
        let key = load_signing_key(config.key_file())?;
        let stream = vaultwire_transport::connect(&target).await?;
        info!(%target, agent = %config.agent_name, "connected to vault");
        Self::from_stream(stream, &config.agent_name, &key).await
    }

    /// Authenticate over an already-open stream, loading the key named by `config`.
    pub async fn connect_with_stream<S>(stream: S, config: &ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let key = load_signing_key(config.key_file())?;
        Self::from_stream(stream, &config.agent_name, &key).await
    }

    /// Authenticate over an already-open stream with an in-memory key.
    pub async fn from_stream<S>(stream: S, agent_name: &str, key: &SigningKey) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mux = Multiplexer::new(stream);
        match authenticate(&mux, agent_name, key).await {
            Ok(session) => Ok(Self {
                mux,
                session: Some(session),
                leases: Mutex::new(HashMap::new()),
            }),
            Err(err) => {
                mux.shutdown().await;
                Err(err)
            }
        }
    }

    /// Fetch the secret at `path`, tracking the lease the vault grants.
    pub async fn retrieve(&self, path: &str, ttl: Option<u64>) -> Result<String> {
        let session_id = self.require_session()?;
        let mut params = Params::new();
        params.insert("session_id".into(), json!(session_id));
        params.insert("path".into(), json!(path));
        if let Some(ttl) = ttl {
            params.insert("ttl".into(), json!(ttl));
        }

        let result = self.mux.call(METHOD_RETRIEVE, params).await?;

        // The lease exists once granted, even if the value turns out unusable.
        match result.get("lease_id").and_then(lease_id_of) {
            Some(lease_id) => {
                let lease = Lease {
                    lease_id: lease_id.clone(),
                    path: path.to_string(),
                    ttl: result.get("ttl").and_then(Value::as_u64).or(ttl),
                };
                debug!(lease_id = %lease_id, path, "lease opened");
                self.leases().insert(lease_id, lease);
            }
            None => warn!(path, "retrieve result carried no lease_id; nothing to release"),
        }

        let encoded = result
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::Protocol("retrieve result has no string value".to_string())
            })?;
        decode_secret(encoded)
    }

    /// List the credentials visible to this agent.
    pub async fn list(&self) -> Result<Vec<Value>> {
        let session_id = self.require_session()?;
        let params = rpc::params(json!({ "session_id": session_id }));
        let mut result = self.mux.call(METHOD_LIST, params).await?;
        match result.remove("credentials") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(credentials)) => Ok(credentials),
            Some(other) => Err(ClientError::Protocol(format!(
                "credentials is not an array: {other}"
            ))),
        }
    }

    /// Ask the vault to perform `operation` with the credential at `path`.
    ///
    /// The secret itself never reaches the client.
    pub async fn use_credential(
        &self,
        path: &str,
        operation: &str,
        params: Option<Params>,
    ) -> Result<Params> {
        let session_id = self.require_session()?;
        let mut request = rpc::params(json!({
            "session_id": session_id,
            "path": path,
            "operation": operation,
        }));
        if let Some(params) = params {
            request.insert("params".into(), Value::Object(params));
        }
        self.mux.call(METHOD_USE, request).await
    }

    /// Release `lease_id`. It is no longer tracked afterwards, even if the
    /// vault reports an error.
    pub async fn release_lease(&self, lease_id: &str) -> Result<()> {
        let session_id = self.require_session()?;
        let outcome = self.release_remote(session_id, lease_id).await;
        self.leases().remove(lease_id);
        outcome
    }

    /// Release every tracked lease, then drop the connection.
    ///
    /// Release failures are logged and skipped. Calling this again is a no-op.
    pub async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let mut leases: Vec<String> = self.leases().drain().map(|(id, _)| id).collect();
        leases.sort();
        let total = leases.len();
        let mut failed = 0usize;
        for lease_id in leases {
            if let Err(err) = self.release_remote(&session.session_id, &lease_id).await {
                failed += 1;
                warn!(lease_id = %lease_id, error = %err, "failed to release lease during close");
            }
        }

        self.mux.shutdown().await;
        info!(released = total - failed, failed, "vault session closed");
    }

    /// Server-issued session id while authenticated.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Ids of all tracked leases, sorted.
    pub fn open_leases(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.leases().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Details of a tracked lease.
    pub fn lease(&self, lease_id: &str) -> Option<Lease> {
        self.leases().get(lease_id).cloned()
    }

    /// Returns true while authenticated and the connection is up.
    pub fn is_connected(&self) -> bool {
        self.session.is_some() && self.mux.is_connected()
    }

    fn require_session(&self) -> Result<&str> {
        self.session_id().ok_or(ClientError::NotConnected)
    }

    fn leases(&self) -> MutexGuard<'_, HashMap<String, Lease>> {
        self.leases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn release_remote(&self, session_id: &str, lease_id: &str) -> Result<()> {
        let params = rpc::params(json!({ "session_id": session_id, "lease_id": lease_id }));
        self.mux.call(METHOD_RELEASE_LEASE, params).await?;
        debug!(lease_id, "lease released");
        Ok(())
    }
}

fn lease_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Decode a hex-encoded secret into UTF-8 text.
fn decode_secret(encoded: &str) -> Result<String> {
    let bytes = hex::decode(encoded)
        .map_err(|err| ClientError::Protocol(format!("secret value is not hex: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|_| ClientError::Protocol("secret value is not valid UTF-8".to_string()))
}
