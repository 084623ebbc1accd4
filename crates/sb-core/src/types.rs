//! Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use sb_protocol::ServerId;

/// Locally generated, strictly increasing identifier for one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DispatchId(pub u64);

impl DispatchId {
    /// Create a new dispatch ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch-{}", self.0)
    }
}

/// One request to run a single command on a single server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub server_id: ServerId,
    /// Command text, trimmed
    pub command_text: String,
    pub dispatch_id: DispatchId,
}

impl CommandRequest {
    pub fn new(server_id: ServerId, command_text: &str, dispatch_id: DispatchId) -> Self {
        Self {
            server_id,
            command_text: command_text.trim().to_string(),
            dispatch_id,
        }
    }
}

/// Resolved result of one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub server_id: ServerId,
    pub success: bool,
    pub output: String,
    /// Human-readable summary
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CommandOutcome {
    /// Create an outcome stamped with the current time
    pub fn new(
        server_id: ServerId,
        success: bool,
        output: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::at(server_id, success, output, message, Utc::now())
    }

    /// Create an outcome with an explicit timestamp
    pub fn at(
        server_id: ServerId,
        success: bool,
        output: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            server_id,
            success,
            output: output.into(),
            message: message.into(),
            timestamp,
        }
    }
}

/// How a batch runs its dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One dispatch at a time, stop on first failure
    #[default]
    Sequential,
    /// All dispatches at once, collect every result
    Parallel,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecutionMode::Sequential),
            "parallel" | "par" => Ok(ExecutionMode::Parallel),
            other => Err(format!(
                "unknown execution mode '{}' (expected sequential or parallel)",
                other
            )),
        }
    }
}

/// One failed dispatch inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub command: String,
    pub server_id: ServerId,
    pub reason: String,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' on server {}: {}",
            self.command, self.server_id, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_id_display() {
        assert_eq!(format!("{}", DispatchId::new(42)), "dispatch-42");
    }

    #[test]
    fn test_command_request_trims_text() {
        let req = CommandRequest::new(ServerId(1), "  ls -la \n", DispatchId(1));
        assert_eq!(req.command_text, "ls -la");
    }

    #[test]
    fn test_execution_mode_parse() {
        assert_eq!("parallel".parse::<ExecutionMode>(), Ok(ExecutionMode::Parallel));
        assert_eq!("Sequential".parse::<ExecutionMode>(), Ok(ExecutionMode::Sequential));
        assert!("sideways".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_batch_failure_display() {
        let failure = BatchFailure {
            command: "ls".to_string(),
            server_id: ServerId(2),
            reason: "Server 2 is not connected".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "'ls' on server 2: Server 2 is not connected"
        );
    }
}
