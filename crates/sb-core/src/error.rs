//! Core error types for MCP Switchboard

use sb_protocol::{ProtocolError, ServerId};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::{BatchFailure, CommandOutcome, DispatchId};

/// Top-level error type for the switchboard client
#[derive(Error, Debug)]
pub enum SwitchboardError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Dispatch error
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Batch error
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Remote call error
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Command history error
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// Errors from a single command dispatch
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// Target server is unknown or not connected; nothing was sent
    #[error("Server {0} is not connected")]
    ServerNotConnected(ServerId),

    /// Command text is blank after trimming
    #[error("Command is empty")]
    EmptyCommand,

    /// The push channel is not open
    #[error("Channel unavailable")]
    ChannelUnavailable,

    /// The request/response fallback failed
    #[error("Remote call failed: {0}")]
    RemoteCallFailed(#[from] RemoteError),

    /// No `command_result` arrived within the dispatch timeout
    #[error("No result from server {server_id} for {dispatch_id}")]
    DispatchTimedOut {
        server_id: ServerId,
        dispatch_id: DispatchId,
    },

    /// The session was closed while the dispatch was pending
    #[error("Session closed before a result arrived")]
    SessionClosed,

    /// The backend hung up the channel while the dispatch was pending
    #[error("Channel lost before a result arrived")]
    ChannelLost,
}

/// Errors from a batch run
#[derive(Error, Debug, Clone)]
pub enum BatchError {
    /// No targets or no commands; nothing was dispatched
    #[error("Invalid batch job: {0}")]
    InvalidBatchJob(String),

    /// Sequential batch stopped at its first failure
    #[error("Batch aborted after {} outcome(s): {failure}", .completed.len())]
    BatchAborted {
        completed: Vec<CommandOutcome>,
        failure: BatchFailure,
    },

    /// Parallel batch finished with at least one failure
    #[error("{failed} command(s) failed")]
    PartialBatchFailure {
        failed: usize,
        failures: Vec<BatchFailure>,
        succeeded: Vec<CommandOutcome>,
    },
}

/// Errors from calls to the external management service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Non-2xx response
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not decode
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Delete refused because the server is connected
    #[error("Server {0} is connected; disconnect it first")]
    ServerConnected(ServerId),
}

/// Push channel errors
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Could not open the connection
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// The connection is closed
    #[error("Channel closed")]
    Closed,

    /// Protocol error on an outgoing frame
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Command history store errors
#[derive(Error, Debug)]
pub enum HistoryError {
    /// I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding error
    #[error("Failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
}
