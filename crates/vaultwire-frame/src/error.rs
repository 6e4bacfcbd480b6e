/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer than four bytes are buffered; the length prefix is not readable yet.
    #[error("incomplete frame header ({available} of 4 bytes)")]
    IncompleteHeader { available: usize },

    /// The header is complete but the body has not fully arrived.
    #[error("incomplete frame body ({available} of {expected} bytes)")]
    IncompleteBody { expected: usize, available: usize },

    /// The payload exceeds the maximum message size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The frame body is not valid JSON, or a value could not be serialized.
    #[error("frame json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns true if more input may turn this into a successful decode.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            FrameError::IncompleteHeader { .. } | FrameError::IncompleteBody { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
