//! Error types for protocol parsing.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while handling protocol documents.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A response body was received but does not conform to the expected
    /// structure.
    #[error("malformed change-feed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An unknown provider name was encountered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}
