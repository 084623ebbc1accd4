//! Message types for the switchboard push channel
//!
//! Every frame is a JSON object with a `type` discriminator. Frames the
//! client sends are [`ClientMessage`]; frames the backend pushes are
//! [`ServerMessage`].
//!
//! # Message Flow
//!
//! 1. Client opens the channel; backend pushes an initial `server_list`
//! 2. `connect_server` / `disconnect_server` are answered by `server_status_update`
//! 3. `execute_command` is answered by `command_result` for the same server
//! 4. `get_server_list` is answered by a fresh `server_list`
//!
//! The backend may push other kinds (e.g. periodic `server_metrics`). These
//! are kept verbatim as [`ServerMessage::Other`] so newer backends keep
//! working against older clients.
//!
//! `command_result` carries no correlation token. Results are matched to
//! requests per server in issue order by the client session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::server::{Server, ServerId};

/// Messages sent from the client to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for a fresh `server_list` snapshot
    GetServerList,

    /// Connect a registered server
    ConnectServer { server_id: ServerId },

    /// Disconnect a registered server
    DisconnectServer { server_id: ServerId },

    /// Run a command on a server
    ExecuteCommand { server_id: ServerId, command: String },
}

impl ClientMessage {
    /// Wire name of this message kind
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::GetServerList => "get_server_list",
            ClientMessage::ConnectServer { .. } => "connect_server",
            ClientMessage::DisconnectServer { .. } => "disconnect_server",
            ClientMessage::ExecuteCommand { .. } => "execute_command",
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Messages pushed from the backend to the client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Full snapshot of registered servers
    ServerList { servers: Vec<Server> },

    /// Connection status changed for one server
    ServerStatusUpdate {
        server_id: ServerId,
        status: bool,
        message: String,
    },

    /// Result of an `execute_command`
    CommandResult {
        server_id: ServerId,
        success: bool,
        output: String,
        message: String,
    },

    /// Any kind this client doesn't model, kept as received
    Other(Value),
}

/// Typed subset of [`ServerMessage`] used for (de)serialization
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownServerMessage {
    ServerList {
        servers: Vec<Server>,
    },
    ServerStatusUpdate {
        server_id: ServerId,
        status: bool,
        #[serde(default)]
        message: String,
    },
    CommandResult {
        server_id: ServerId,
        success: bool,
        #[serde(default)]
        output: String,
        #[serde(default)]
        message: String,
    },
}

const KNOWN_KINDS: [&str; 3] = ["server_list", "server_status_update", "command_result"];

impl From<KnownServerMessage> for ServerMessage {
    fn from(msg: KnownServerMessage) -> Self {
        match msg {
            KnownServerMessage::ServerList { servers } => ServerMessage::ServerList { servers },
            KnownServerMessage::ServerStatusUpdate {
                server_id,
                status,
                message,
            } => ServerMessage::ServerStatusUpdate {
                server_id,
                status,
                message,
            },
            KnownServerMessage::CommandResult {
                server_id,
                success,
                output,
                message,
            } => ServerMessage::CommandResult {
                server_id,
                success,
                output,
                message,
            },
        }
    }
}

impl ServerMessage {
    /// Wire name of this message kind
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::ServerList { .. } => "server_list",
            ServerMessage::ServerStatusUpdate { .. } => "server_status_update",
            ServerMessage::CommandResult { .. } => "command_result",
            ServerMessage::Other(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    /// Parse a JSON text frame.
    ///
    /// Unknown `type` values decode to [`ServerMessage::Other`]. A known
    /// `type` with missing or mistyped fields is an error rather than a
    /// passthrough.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_owned();

        if KNOWN_KINDS.contains(&kind.as_str()) {
            serde_json::from_value::<KnownServerMessage>(value)
                .map(ServerMessage::from)
                .map_err(|source| ProtocolError::Malformed { kind, source })
        } else {
            Ok(ServerMessage::Other(value))
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        let known = match self.clone() {
            ServerMessage::ServerList { servers } => KnownServerMessage::ServerList { servers },
            ServerMessage::ServerStatusUpdate {
                server_id,
                status,
                message,
            } => KnownServerMessage::ServerStatusUpdate {
                server_id,
                status,
                message,
            },
            ServerMessage::CommandResult {
                server_id,
                success,
                output,
                message,
            } => KnownServerMessage::CommandResult {
                server_id,
                success,
                output,
                message,
            },
            ServerMessage::Other(value) => return Ok(serde_json::to_string(&value)?),
        };
        Ok(serde_json::to_string(&known)?)
    }
}
