//! Client error types.
//!
//! Every way a single request/response exchange can fail has a named variant.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PosteError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout:?} during {stage}")]
    Timeout {
        stage: &'static str,
        timeout: Duration,
    },

    #[error("Connection closed with incomplete response ({received} bytes received)")]
    IncompleteResponse { received: usize },

    #[error("Unrecognized response shape: {0}")]
    UnrecognizedResponse(Value),

    #[error("Malformed JSON response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("Failed to serialize request: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, PosteError>;
