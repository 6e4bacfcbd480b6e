//! Challenge-response authentication.
//!
//! ```text
//! client                                 vault
//!   │ authenticate {agent_name}            │
//!   │─────────────────────────────────────▶│
//!   │        {session_id, challenge(hex)}  │
//!   │◀─────────────────────────────────────│
//!   │ challenge_response                   │
//!   │   {session_id, signature(hex)}       │
//!   │─────────────────────────────────────▶│
//!   │                {authenticated: bool} │
//!   │◀─────────────────────────────────────│
//! ```
//!
//! The signature is a detached Ed25519 signature over the raw challenge
//! bytes; the seed never leaves the client.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::mux::Multiplexer;
use crate::rpc::{params, METHOD_AUTHENTICATE, METHOD_CHALLENGE_RESPONSE};

const MAX_AGENT_NAME_LEN: usize = 128;

/// Progress of one handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Disconnected,
    Connected,
    ChallengeIssued,
    Authenticated,
    AuthFailed,
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque server-issued session identifier.
    pub session_id: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field(
                "session_id",
                &format_args!("<redacted:{} bytes>", self.session_id.len()),
            )
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChallengeIssued {
    session_id: String,
    challenge: String,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    authenticated: bool,
}

/// Client side of the authentication exchange.
#[derive(Debug)]
pub struct Handshake<'a> {
    agent_name: &'a str,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    /// Start a handshake for `agent_name`.
    pub fn new(agent_name: &'a str) -> Self {
        Self {
            agent_name,
            state: HandshakeState::Disconnected,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run the exchange to completion over `mux`.
    ///
    /// Any failure leaves the handshake in [`HandshakeState::AuthFailed`].
    pub async fn run(&mut self, mux: &Multiplexer, key: &SigningKey) -> Result<Session> {
        match self.exchange(mux, key).await {
            Ok(session) => {
                self.state = HandshakeState::Authenticated;
                info!(agent = self.agent_name, "authenticated with vault");
                Ok(session)
            }
            Err(err) => {
                self.state = HandshakeState::AuthFailed;
                warn!(agent = self.agent_name, error = %err, "authentication failed");
                Err(err)
            }
        }
    }

    async fn exchange(&mut self, mux: &Multiplexer, key: &SigningKey) -> Result<Session> {
        validate_agent_name(self.agent_name)?;
        if !mux.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.state = HandshakeState::Connected;

        let result = mux
            .call(METHOD_AUTHENTICATE, params(json!({ "agent_name": self.agent_name })))
            .await?;
        let issued: ChallengeIssued = serde_json::from_value(result.into())
            .map_err(|err| ClientError::Auth(format!("malformed challenge: {err}")))?;
        validate_session_id(&issued.session_id)?;
        let challenge = decode_challenge(&issued.challenge)?;
        self.state = HandshakeState::ChallengeIssued;
        debug!(challenge_len = challenge.len(), "received challenge");

        let signature = key.sign(&challenge);
        let result = mux
            .call(
                METHOD_CHALLENGE_RESPONSE,
                params(json!({
                    "session_id": issued.session_id,
                    "signature": hex::encode(signature.to_bytes()),
                })),
            )
            .await?;
        let verdict: Verdict = serde_json::from_value(result.into())
            .map_err(|err| ClientError::Auth(format!("malformed verdict: {err}")))?;

        if !verdict.authenticated {
            return Err(ClientError::Auth("challenge response rejected".to_string()));
        }

        Ok(Session {
            session_id: issued.session_id,
        })
    }
}

/// Authenticate `agent_name` over an open multiplexer.
pub async fn authenticate(mux: &Multiplexer, agent_name: &str, key: &SigningKey) -> Result<Session> {
    Handshake::new(agent_name).run(mux, key).await
}

fn validate_agent_name(agent_name: &str) -> Result<()> {
    if agent_name.is_empty() || agent_name.len() > MAX_AGENT_NAME_LEN {
        return Err(ClientError::Auth(format!(
            "invalid agent name length: {}",
            agent_name.len()
        )));
    }
    Ok(())
}

fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() {
        return Err(ClientError::Auth("empty session_id".to_string()));
    }
    Ok(())
}

fn decode_challenge(challenge: &str) -> Result<Vec<u8>> {
    if challenge.is_empty() {
        return Err(ClientError::Auth("empty challenge".to_string()));
    }
    hex::decode(challenge).map_err(|err| ClientError::Auth(format!("challenge is not hex: {err}")))
}
