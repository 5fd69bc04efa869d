//! Error types for the script cache.

use std::path::PathBuf;
use thiserror::Error;

use crate::sbin::StringId;

/// Main error type for script cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Cache file does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Header magic does not match; the stream is not a cached script
    #[error("Invalid script binary: bad magic 0x{found:08x}")]
    InvalidMagic { found: u32 },

    /// Stream ended before a complete block could be read
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Unknown block class, node type or similar structural problem
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Transition markers do not nest correctly
    #[error("Malformed nesting: {0}")]
    MalformedNesting(String),

    /// A node block references a string ID missing from the string table
    #[error("String ID {0} not found in string table")]
    StringNotFound(StringId),

    /// The tree cannot be expressed in the fixed block layout
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Configuration file could not be interpreted
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Cache directory could not be initialised
    #[error("Cache directory unavailable: {path}: {source}")]
    CacheDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON error while reading or writing configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a malformed nesting error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedNesting(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// True for errors that mean the stream content is corrupt or truncated,
    /// as opposed to the environment failing.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. }
                | Self::UnexpectedEof(_)
                | Self::InvalidStructure(_)
                | Self::MalformedNesting(_)
                | Self::StringNotFound(_)
                | Self::Utf8(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        // Short reads surface as UnexpectedEof; callers that know the stream
        // position replace the 0 with it.
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof(0)
        } else {
            Self::Io(e)
        }
    }
}

/// Result type alias for script cache operations.
pub type Result<T> = std::result::Result<T, Error>;
