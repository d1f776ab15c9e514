//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Frame is not an event object")]
    NotAnEvent,
}
