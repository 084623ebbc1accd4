//! Server record and identifier types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned identifier for a registered MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub u64);

impl ServerId {
    /// Create a new server ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ServerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for ServerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Kind of MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    Github,
    Playwright,
    Api,
    Gitlab,
    Postgres,
    Redis,
    Sqlite,
    /// Anything the backend reports that we don't know by name
    #[default]
    #[serde(other)]
    Other,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Github => "github",
            ServerType::Playwright => "playwright",
            ServerType::Api => "api",
            ServerType::Gitlab => "gitlab",
            ServerType::Postgres => "postgres",
            ServerType::Redis => "redis",
            ServerType::Sqlite => "sqlite",
            ServerType::Other => "other",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServerType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "github" => ServerType::Github,
            "playwright" => ServerType::Playwright,
            "api" => ServerType::Api,
            "gitlab" => ServerType::Gitlab,
            "postgres" => ServerType::Postgres,
            "redis" => ServerType::Redis,
            "sqlite" => ServerType::Sqlite,
            _ => ServerType::Other,
        })
    }
}

/// A registered MCP server as reported by the backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(rename = "type", default)]
    pub server_type: ServerType,
    /// Opaque credential. Never rendered.
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Whether the server is currently connected
    #[serde(default)]
    pub status: bool,
}

impl Server {
    /// `host:port` for display
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_type", &self.server_type)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("status", &self.status)
            .finish()
    }
}
