//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Configuration for the switchboard client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the management REST service
    pub api_url: String,

    /// Base URL of the push channel; the client id is appended as a path segment
    pub ws_url: String,

    /// Client identifier used in the channel URL
    pub client_id: u64,

    /// How long a channel dispatch waits for its `command_result`.
    /// Zero waits forever.
    #[serde(with = "duration_secs")]
    pub dispatch_timeout: Duration,

    /// Timeout for each REST call
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Where the command history is persisted
    pub history_path: PathBuf,

    /// Maximum number of remembered commands
    pub history_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000/ws".to_string(),
            client_id: 1,
            dispatch_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            history_path: super::default_history_path(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Full channel URL for this client
    pub fn channel_url(&self) -> String {
        format!("{}/{}", self.ws_url.trim_end_matches('/'), self.client_id)
    }

    /// Dispatch timeout, or `None` when disabled
    pub fn dispatch_deadline(&self) -> Option<Duration> {
        if self.dispatch_timeout.is_zero() {
            None
        } else {
            Some(self.dispatch_timeout)
        }
    }
}

/// Durations as whole seconds in TOML
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
