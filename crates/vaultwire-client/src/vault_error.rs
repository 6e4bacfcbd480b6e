//! Translation of wire-level error payloads into typed errors.
//!
//! The daemon reports failures either as a bare string or as a structured
//! object carrying a stable code plus human guidance. [`VaultError::from_wire`]
//! is total: every payload maps to exactly one [`VaultError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rpc::Response;

/// Server-declared error kinds. Unrecognized codes become [`ErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthFailed,
    AccessDenied,
    CredentialNotFound,
    VaultLocked,
    LeaseExpired,
    RateLimited,
    SessionExpired,
    Unknown,
}

impl ErrorCode {
    /// Look up a wire code. Never fails.
    pub fn from_wire(code: &str) -> Self {
        match code {
            "AUTH_FAILED" => Self::AuthFailed,
            "ACCESS_DENIED" => Self::AccessDenied,
            "CREDENTIAL_NOT_FOUND" => Self::CredentialNotFound,
            "VAULT_LOCKED" => Self::VaultLocked,
            "LEASE_EXPIRED" => Self::LeaseExpired,
            "RATE_LIMITED" => Self::RateLimited,
            "SESSION_EXPIRED" => Self::SessionExpired,
            _ => Self::Unknown,
        }
    }

    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailed => "AUTH_FAILED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::CredentialNotFound => "CREDENTIAL_NOT_FOUND",
            Self::VaultLocked => "VAULT_LOCKED",
            Self::LeaseExpired => "LEASE_EXPIRED",
            Self::RateLimited => "RATE_LIMITED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error object as sent by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// The `error` member of a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireError {
    /// Plain message.
    Message(String),
    /// Code plus guidance fields.
    Structured(StructuredError),
    /// Anything else the daemon might put there.
    Other(Value),
}

/// A typed error raised from a response's `error` member.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct VaultError {
    /// Dispatchable kind.
    pub kind: ErrorCode,
    /// Code exactly as received (`UNKNOWN` for plain-string errors).
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub suggestion: Option<String>,
    pub docs_url: Option<String>,
    pub context: Map<String, Value>,
}

impl VaultError {
    /// Generic error carrying only a message.
    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorCode::Unknown,
            code: ErrorCode::Unknown.as_str().to_string(),
            message: message.into(),
            detail: None,
            suggestion: None,
            docs_url: None,
            context: Map::new(),
        }
    }

    /// Map a wire error payload to its typed error.
    pub fn from_wire(error: WireError) -> Self {
        match error {
            WireError::Message(message) => Self::generic(message),
            WireError::Structured(structured) => Self::from(structured),
            WireError::Other(value) => Self::generic(value.to_string()),
        }
    }

    /// Returns true if the error is of the given kind.
    pub fn is(&self, kind: ErrorCode) -> bool {
        self.kind == kind
    }
}

impl From<StructuredError> for VaultError {
    fn from(error: StructuredError) -> Self {
        let kind = ErrorCode::from_wire(&error.code);
        let code = if error.code.is_empty() {
            kind.as_str().to_string()
        } else {
            error.code
        };
        Self {
            kind,
            code,
            message: error.message,
            detail: error.detail,
            suggestion: error.suggestion,
            docs_url: error.docs_url,
            context: error.context.unwrap_or_default(),
        }
    }
}

/// Fail with the typed error if `response` carries one; otherwise do nothing.
pub fn raise_on_error(response: &Response) -> Result<(), VaultError> {
    match &response.error {
        None => Ok(()),
        Some(error) => Err(VaultError::from_wire(error.clone())),
    }
}
