use std::sync::{Arc, Mutex};

use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use vaultwire_client::rpc::{self, METHOD_RELEASE_LEASE};
use vaultwire_client::{
    ClientConfig, ClientError, ErrorCode, Params, Request, Response, VaultClient,
};
use vaultwire_frame::JsonCodec;

const AGENT: &str = "deploy-bot";
const SESSION_ID: &str = "sess-7f3a";
const CHALLENGE_HEX: &str = "c0ffee00deadbeef0102030405060708";

type Reply = Result<Value, Value>;
type Handler = Arc<dyn Fn(&Request) -> Reply + Send + Sync>;
type Log = Arc<Mutex<Vec<Request>>>;

fn agent_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

/// Scripted vault daemon: runs the challenge-response exchange against
/// `verifying`, then answers every other request through `handler`.
fn spawn_vault<S>(stream: S, verifying: VerifyingKey, handler: Handler) -> Log
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    tokio::spawn(async move {
        let mut framed = Framed::new(stream, JsonCodec::new());
        while let Some(Ok(frame)) = framed.next().await {
            let request: Request = serde_json::from_value(frame).expect("client sends requests");
            seen.lock().expect("log lock").push(request.clone());

            let reply = match request.method.as_str() {
                "authenticate" => Ok(json!({"session_id": SESSION_ID, "challenge": CHALLENGE_HEX})),
                "challenge_response" => {
                    let signature = request.params["signature"]
                        .as_str()
                        .and_then(|sig| hex::decode(sig).ok())
                        .and_then(|bytes| Signature::from_slice(&bytes).ok());
                    let challenge = hex::decode(CHALLENGE_HEX).expect("challenge is hex");
                    let valid = request.params["session_id"] == SESSION_ID
                        && signature.is_some_and(|sig| verifying.verify(&challenge, &sig).is_ok());
                    Ok(json!({"authenticated": valid}))
                }
                _ => handler(&request),
            };

            let response = match reply {
                Ok(result) => Response::ok(request.id, rpc::params(result)),
                Err(error) => Response::err(
                    request.id,
                    serde_json::from_value(error).expect("handler errors are wire errors"),
                ),
            };
            if framed.send(response).await.is_err() {
                break;
            }
        }
    });

    log
}

fn default_handler() -> Handler {
    Arc::new(|request: &Request| match request.method.as_str() {
        "retrieve" => match request.params["path"].as_str() {
            Some("openai/api_key") => Ok(json!({"value": "68656c6c6f", "lease_id": "lease-1"})),
            Some("github/token") => Ok(json!({"value": "676870", "lease_id": "lease-2", "ttl": 30})),
            _ => Err(json!({
                "code": "CREDENTIAL_NOT_FOUND",
                "message": "no credential at path",
                "suggestion": "run `vaultwire list`"
            })),
        },
        "list" => Ok(json!({"credentials": [{"path": "a"}, {"path": "b"}]})),
        "release_lease" => Ok(json!({})),
        "use" => Ok(json!({
            "status": 200,
            "operation": request.params["operation"],
        })),
        other => Err(json!(format!("unsupported method {other}"))),
    })
}

async fn connected(handler: Handler) -> (VaultClient, Log) {
    let (client_side, vault_side) = tokio::io::duplex(64 * 1024);
    let key = agent_key();
    let log = spawn_vault(vault_side, key.verifying_key(), handler);
    let client = VaultClient::from_stream(client_side, AGENT, &key)
        .await
        .expect("handshake should succeed");
    (client, log)
}

fn requests_for(log: &Log, method: &str) -> Vec<Request> {
    log.lock()
        .expect("log lock")
        .iter()
        .filter(|request| request.method == method)
        .cloned()
        .collect()
}

#[tokio::test]
async fn handshake_establishes_session() {
    let (client, log) = connected(default_handler()).await;

    assert!(client.is_connected());
    assert_eq!(client.session_id(), Some(SESSION_ID));

    let auth = requests_for(&log, "authenticate");
    assert_eq!(auth.len(), 1);
    assert_eq!(auth[0].params["agent_name"], AGENT);
    assert_eq!(auth[0].id, 1);
}

#[tokio::test]
async fn wrong_key_fails_authentication() {
    let (client_side, vault_side) = tokio::io::duplex(64 * 1024);
    let other = SigningKey::from_bytes(&[1u8; 32]);
    let _log = spawn_vault(vault_side, other.verifying_key(), default_handler());

    let result = VaultClient::from_stream(client_side, AGENT, &agent_key()).await;
    assert!(matches!(result, Err(ClientError::Auth(_))));
}

#[tokio::test]
async fn retrieve_decodes_secret_and_tracks_lease() {
    let (client, log) = connected(default_handler()).await;

    let secret = client
        .retrieve("openai/api_key", None)
        .await
        .expect("retrieve should succeed");
    assert_eq!(secret, "hello");
    assert_eq!(client.open_leases(), vec!["lease-1".to_string()]);

    let lease = client.lease("lease-1").expect("lease is tracked");
    assert_eq!(lease.path, "openai/api_key");
    assert_eq!(lease.ttl, None);

    let sent = requests_for(&log, "retrieve");
    assert_eq!(sent[0].params["session_id"], SESSION_ID);
    assert_eq!(sent[0].params["path"], "openai/api_key");
    assert!(sent[0].params.get("ttl").is_none());
}

#[tokio::test]
async fn retrieve_forwards_ttl() {
    let (client, log) = connected(default_handler()).await;

    client
        .retrieve("openai/api_key", Some(90))
        .await
        .expect("retrieve should succeed");
    assert_eq!(requests_for(&log, "retrieve")[0].params["ttl"], 90);
    assert_eq!(client.lease("lease-1").and_then(|l| l.ttl), Some(90));

    client
        .retrieve("github/token", Some(90))
        .await
        .expect("retrieve should succeed");
    assert_eq!(client.lease("lease-2").and_then(|l| l.ttl), Some(30));
}

#[tokio::test]
async fn retrieve_error_is_typed_and_tracks_nothing() {
    let (client, _log) = connected(default_handler()).await;

    let err = client
        .retrieve("missing/path", None)
        .await
        .expect_err("retrieve should fail");
    let vault = err.as_vault().expect("server error");
    assert!(vault.is(ErrorCode::CredentialNotFound));
    assert_eq!(vault.suggestion.as_deref(), Some("run `vaultwire list`"));
    assert!(client.open_leases().is_empty());
    assert!(client.is_connected());
}

#[tokio::test]
async fn list_returns_credentials() {
    let (client, _log) = connected(default_handler()).await;

    let credentials = client.list().await.expect("list should succeed");
    assert_eq!(credentials.len(), 2);
    assert_eq!(credentials[0]["path"], "a");
    assert_eq!(credentials[1]["path"], "b");
}

#[tokio::test]
async fn list_without_credentials_is_empty() {
    let (client, _log) = connected(Arc::new(|_: &Request| -> Reply { Ok(json!({})) })).await;
    assert!(client.list().await.expect("list should succeed").is_empty());
}

#[tokio::test]
async fn use_credential_never_returns_secret() {
    let (client, log) = connected(default_handler()).await;

    let mut params = Params::new();
    params.insert("url".to_string(), json!("https://api.example/v1/models"));
    let result = client
        .use_credential("openai/api_key", "http_get", Some(params))
        .await
        .expect("use should succeed");
    assert_eq!(result["status"], 200);
    assert_eq!(result["operation"], "http_get");
    assert!(client.open_leases().is_empty());

    let sent = &requests_for(&log, "use")[0];
    assert_eq!(sent.params["path"], "openai/api_key");
    assert_eq!(sent.params["operation"], "http_get");
    assert_eq!(sent.params["params"]["url"], "https://api.example/v1/models");
}

#[tokio::test]
async fn release_lease_stops_tracking() {
    let (client, log) = connected(default_handler()).await;

    client
        .retrieve("openai/api_key", None)
        .await
        .expect("retrieve should succeed");
    client
        .release_lease("lease-1")
        .await
        .expect("release should succeed");
    assert!(client.open_leases().is_empty());

    client
        .release_lease("never-issued")
        .await
        .expect("release of untracked id should succeed");

    let released = requests_for(&log, METHOD_RELEASE_LEASE);
    assert_eq!(released.len(), 2);
    assert_eq!(released[0].params["lease_id"], "lease-1");
}

#[tokio::test]
async fn close_releases_each_open_lease_once() {
    let (mut client, log) = connected(default_handler()).await;

    client
        .retrieve("openai/api_key", None)
        .await
        .expect("retrieve should succeed");
    client.close().await;

    let released = requests_for(&log, METHOD_RELEASE_LEASE);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].params["lease_id"], "lease-1");
    assert_eq!(released[0].params["session_id"], SESSION_ID);

    assert!(!client.is_connected());
    assert_eq!(client.session_id(), None);
    assert!(client.open_leases().is_empty());

    client.close().await;
    assert_eq!(requests_for(&log, METHOD_RELEASE_LEASE).len(), 1);

    let after = client.list().await;
    assert!(matches!(after, Err(ClientError::NotConnected)));
}

#[tokio::test]
async fn close_attempts_every_release_despite_failures() {
    let fallback = default_handler();
    let handler: Handler = Arc::new(move |request: &Request| {
        if request.method == "release_lease" && request.params["lease_id"] == "lease-1" {
            return Err(json!({"code": "LEASE_EXPIRED", "message": "lease already expired"}));
        }
        fallback(request)
    });
    let (mut client, log) = connected(handler).await;

    client
        .retrieve("openai/api_key", None)
        .await
        .expect("first retrieve should succeed");
    client
        .retrieve("github/token", None)
        .await
        .expect("second retrieve should succeed");
    assert_eq!(client.open_leases().len(), 2);

    client.close().await;

    let attempted: Vec<Value> = requests_for(&log, METHOD_RELEASE_LEASE)
        .into_iter()
        .map(|request| request.params["lease_id"].clone())
        .collect();
    assert_eq!(attempted, vec![json!("lease-1"), json!("lease-2")]);
    assert!(client.open_leases().is_empty());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn undecodable_secret_still_tracks_lease() {
    let fallback = default_handler();
    let handler: Handler = Arc::new(move |request: &Request| {
        if request.method == "retrieve" {
            return Ok(json!({"value": "ff", "lease_id": "lease-x"}));
        }
        fallback(request)
    });
    let (mut client, log) = connected(handler).await;

    let err = client
        .retrieve("openai/api_key", None)
        .await
        .expect_err("invalid UTF-8 should fail");
    assert!(matches!(err, ClientError::Protocol(_)));
    assert_eq!(client.open_leases(), vec!["lease-x".to_string()]);

    client.close().await;
    let released = requests_for(&log, METHOD_RELEASE_LEASE);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].params["lease_id"], "lease-x");
}

#[tokio::test]
async fn concurrent_calls_share_one_connection() {
    let (client, log) = connected(default_handler()).await;

    let (secret, listing, used) = tokio::join!(
        client.retrieve("openai/api_key", None),
        client.list(),
        client.use_credential("github/token", "sign", None),
    );
    assert_eq!(secret.expect("retrieve should succeed"), "hello");
    assert_eq!(listing.expect("list should succeed").len(), 2);
    assert_eq!(used.expect("use should succeed")["operation"], "sign");

    let mut ids: Vec<u64> = log.lock().expect("log lock").iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn hung_up_daemon_fails_handshake() {
    let (client_side, vault_side) = tokio::io::duplex(1024);
    drop(vault_side);

    let result = VaultClient::from_stream(client_side, AGENT, &agent_key()).await;
    assert!(matches!(
        result,
        Err(ClientError::Disconnected(_)) | Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn connect_with_stream_reads_key_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let key = agent_key();
    std::fs::write(
        dir.path().join(format!("{AGENT}.key")),
        hex::encode(key.to_bytes()),
    )
    .expect("key file should be writable");

    let (client_side, vault_side) = tokio::io::duplex(64 * 1024);
    let _log = spawn_vault(vault_side, key.verifying_key(), default_handler());

    let config = ClientConfig {
        key_dir: dir.path().to_path_buf(),
        ..ClientConfig::new(AGENT)
    };
    let client = VaultClient::connect_with_stream(client_side, &config)
        .await
        .expect("handshake should succeed");
    assert_eq!(client.session_id(), Some(SESSION_ID));
}

#[tokio::test]
async fn missing_key_file_fails_before_connecting() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = ClientConfig {
        key_dir: dir.path().to_path_buf(),
        socket_path: Some(dir.path().join("vault.sock")),
        ..ClientConfig::new(AGENT)
    };
    let result = VaultClient::connect(&config).await;
    assert!(matches!(result, Err(ClientError::KeyFile { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn connects_over_unix_socket() {
    let dir = tempfile::tempdir().expect("temp dir");
    let sock_path = dir.path().join("vault.sock");
    let key_path = dir.path().join("agent.key");
    let key = agent_key();
    std::fs::write(&key_path, format!("{}\n", hex::encode(key.to_bytes())))
        .expect("key file should be writable");

    let listener = tokio::net::UnixListener::bind(&sock_path).expect("listener should bind");
    let verifying = key.verifying_key();
    let accepted: tokio::task::JoinHandle<Log> = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        spawn_vault(stream, verifying, default_handler())
    });

    let config = ClientConfig {
        socket_path: Some(sock_path),
        key_path: Some(key_path),
        ..ClientConfig::new(AGENT)
    };
    let mut client = VaultClient::connect(&config)
        .await
        .expect("connect should succeed");
    let log = accepted.await.expect("accept task");

    assert_eq!(
        client
            .retrieve("openai/api_key", None)
            .await
            .expect("retrieve should succeed"),
        "hello"
    );
    client.close().await;
    assert_eq!(requests_for(&log, METHOD_RELEASE_LEASE).len(), 1);
}
