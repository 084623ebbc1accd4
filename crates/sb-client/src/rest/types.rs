//! Request and response bodies of the management service

use serde::{Deserialize, Serialize};

use sb_protocol::{ServerId, ServerType};

/// Body for creating or updating a server
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDraft {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub server_type: ServerType,
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ServerDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDraft")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_type", &self.server_type)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One entry of a server's execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub success: bool,
}

/// The logs endpoint answers with either a bare list or `{"logs": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum LogsResponse {
    List(Vec<LogEntry>),
    Wrapped { logs: Vec<LogEntry> },
}

impl From<LogsResponse> for Vec<LogEntry> {
    fn from(response: LogsResponse) -> Self {
        match response {
            LogsResponse::List(logs) | LogsResponse::Wrapped { logs } => logs,
        }
    }
}

/// Resource usage sample for one server
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_in: f64,
    pub network_out: f64,
}

/// Response of `POST /execute/{id}`
#[derive(Debug, Deserialize)]
pub(crate) struct ExecuteResponse {
    #[serde(default)]
    pub message: String,
}

/// A task stored by the management service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub name: String,
    pub command: String,
    pub server_id: ServerId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

/// Body for creating a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub name: String,
    pub command: String,
    pub server_id: ServerId,
}
