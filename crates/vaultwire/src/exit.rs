use std::fmt;
use std::io;

use vaultwire_client::{ClientError, ErrorCode, VaultError};
use vaultwire_frame::FrameError;
use vaultwire_transport::TransportError;

// Exit codes follow the sysexits-style table shared by the vaultwire tools.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const NOT_FOUND: i32 = 44;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TEMPORARY: i32 = 75;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, target } => {
            io_error(&format!("{context} ({target})"), source)
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::FrameTooLarge { .. } | FrameError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn vault_error(context: &str, err: &VaultError) -> CliError {
    let code = match err.kind {
        ErrorCode::AuthFailed | ErrorCode::AccessDenied => PERMISSION_DENIED,
        ErrorCode::CredentialNotFound => NOT_FOUND,
        ErrorCode::VaultLocked
        | ErrorCode::LeaseExpired
        | ErrorCode::RateLimited
        | ErrorCode::SessionExpired => TEMPORARY,
        ErrorCode::Unknown => FAILURE,
    };

    let mut message = format!("{context}: {err}");
    if let Some(detail) = &err.detail {
        message.push_str(&format!("\n  detail: {detail}"));
    }
    if let Some(suggestion) = &err.suggestion {
        message.push_str(&format!("\n  hint: {suggestion}"));
    }
    if let Some(docs_url) = &err.docs_url {
        message.push_str(&format!("\n  docs: {docs_url}"));
    }
    CliError::new(code, message)
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Frame(err) => frame_error(context, err),
        ClientError::Vault(err) => vault_error(context, &err),
        ClientError::Auth(_) | ClientError::KeyFile { .. } => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        ClientError::Json(_) | ClientError::Protocol(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ClientError::Disconnected(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ClientError::NotConnected => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
