//! Error types shared by the box codec, the descriptor codec and the file editor.

use std::io;
use thiserror::Error;

/// Result type for mp4edit operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Underlying read/write/seek failure.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Declared sizes do not fit the bytes that are actually there.
    #[error("corrupt file: {0}")]
    Corrupt(String),

    /// Malformed input from the caller (bad type code, bad range, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed on this structure or in this mode.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Configuration could not be parsed.
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Running out of payload bytes while decoding means the declared sizes lied.
    pub(crate) fn truncated(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Corrupt("payload shorter than its declared fields".to_string())
        } else {
            Self::Io(err)
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}
