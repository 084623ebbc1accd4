//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding or encoding channel frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    #[error("Invalid JSON frame: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Frame is JSON but not an object with a string `type` field
    #[error("Frame has no string `type` discriminator")]
    MissingType,

    /// Frame has a known `type` but its fields do not match
    #[error("Malformed `{kind}` message: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
