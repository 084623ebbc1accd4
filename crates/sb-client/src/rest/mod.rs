//! Management service REST client
//!
//! Thin async wrapper over the backend's HTTP API. Every call is a single
//! request; nothing is retried. Non-2xx responses surface the service's
//! `{"detail": ...}` body in [`RemoteError::Status`].

mod types;

pub use types::{LogEntry, ServerDraft, ServerMetrics, Task, TaskDraft};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use sb_core::error::RemoteError;
use sb_protocol::{Server, ServerId};

use crate::dispatcher::ExecutionService;
use types::{ExecuteResponse, LogsResponse};

/// Client for the management REST service
#[derive(Debug, Clone)]
pub struct ManagementClient {
    base_url: String,
    http: Client,
}

impl ManagementClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // Servers

    pub async fn list_servers(&self) -> Result<Vec<Server>, RemoteError> {
        self.json(self.http.get(self.url("/servers"))).await
    }

    pub async fn create_server(&self, draft: &ServerDraft) -> Result<Server, RemoteError> {
        tracing::info!(name = %draft.name, "Creating server");
        self.json(self.http.post(self.url("/servers")).json(draft))
            .await
    }

    pub async fn update_server(
        &self,
        id: ServerId,
        draft: &ServerDraft,
    ) -> Result<Server, RemoteError> {
        tracing::info!(server_id = %id, "Updating server");
        self.json(self.http.put(self.url(&format!("/servers/{}", id))).json(draft))
            .await
    }

    pub async fn delete_server(&self, id: ServerId) -> Result<(), RemoteError> {
        tracing::info!(server_id = %id, "Deleting server");
        self.empty(self.http.delete(self.url(&format!("/servers/{}", id))))
            .await
    }

    pub async fn server_logs(&self, id: ServerId) -> Result<Vec<LogEntry>, RemoteError> {
        let response: LogsResponse = self
            .json(self.http.get(self.url(&format!("/servers/{}/logs", id))))
            .await?;
        Ok(response.into())
    }

    pub async fn server_metrics(&self, id: ServerId) -> Result<ServerMetrics, RemoteError> {
        self.json(self.http.get(self.url(&format!("/servers/{}/metrics", id))))
            .await
    }

    /// `POST /execute/{id}` with a form-encoded `command` field.
    /// Returns the service's `message`.
    pub async fn execute(&self, id: ServerId, command: &str) -> Result<String, RemoteError> {
        let response: ExecuteResponse = self
            .json(
                self.http
                    .post(self.url(&format!("/execute/{}", id)))
                    .form(&[("command", command)]),
            )
            .await?;
        Ok(response.message)
    }

    // Tasks

    pub async fn list_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        self.json(self.http.get(self.url("/tasks"))).await
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, RemoteError> {
        self.json(self.http.post(self.url("/tasks")).json(draft))
            .await
    }

    pub async fn delete_task(&self, id: u64) -> Result<(), RemoteError> {
        self.empty(self.http.delete(self.url(&format!("/tasks/{}", id))))
            .await
    }

    /// Trigger a stored task. Returns the raw response body.
    pub async fn run_task(&self, id: u64) -> Result<serde_json::Value, RemoteError> {
        self.json(self.http.post(self.url(&format!("/tasks/{}/run", id))))
            .await
    }

    // Plumbing

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        tracing::trace!("{} {}", status.as_u16(), response.url());
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            detail: error_detail(&body, status.canonical_reason()),
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn empty(&self, request: RequestBuilder) -> Result<(), RemoteError> {
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl ExecutionService for ManagementClient {
    async fn execute(&self, server_id: ServerId, command: &str) -> Result<String, RemoteError> {
        ManagementClient::execute(self, server_id, command).await
    }
}

/// Pull `detail` out of an error body, falling back to the raw text
fn error_detail(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) => return detail.to_string(),
            None => {}
        }
    }

    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        body.to_string()
    }
}
