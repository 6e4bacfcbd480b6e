use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::vault_error::WireError;

/// RPC method: begin authentication, receive a challenge.
pub const METHOD_AUTHENTICATE: &str = "authenticate";
/// RPC method: answer the authentication challenge.
pub const METHOD_CHALLENGE_RESPONSE: &str = "challenge_response";
/// RPC method: fetch a secret value under a new lease.
pub const METHOD_RETRIEVE: &str = "retrieve";
/// RPC method: enumerate visible credentials.
pub const METHOD_LIST: &str = "list";
/// RPC method: release a lease early.
pub const METHOD_RELEASE_LEASE: &str = "release_lease";
/// RPC method: have the vault act with a secret without returning it.
pub const METHOD_USE: &str = "use";

/// JSON object carried in `params` and `result`.
pub type Params = Map<String, Value>;

/// Unwrap a `json!({...})` literal into [`Params`]; non-objects become empty.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Client request frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: u64,
    pub method: String,
    pub params: Params,
}

impl Request {
    /// Create a request.
    pub fn new(id: u64, method: impl Into<String>, params: Params) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Server response frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Params>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl Response {
    /// A successful response.
    pub fn ok(id: u64, result: Params) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// A failed response.
    pub fn err(id: u64, error: WireError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}
