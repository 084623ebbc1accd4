//! Command dispatcher
//!
//! Routes a [`CommandRequest`] over the push channel when it is open, and
//! through the request/response [`ExecutionService`] otherwise.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sb_core::error::RemoteError;
use sb_core::{CommandOutcome, CommandRequest, DispatchError};
use sb_protocol::ServerId;

use crate::pending::PendingReceiver;
use crate::session::Session;

/// Default wait for a channel `command_result`
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Request/response execution path used when the channel is down
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Run `command` on `server_id` and return the service's message
    async fn execute(&self, server_id: ServerId, command: &str) -> Result<String, RemoteError>;
}

/// Dispatches single commands on behalf of a [`Session`]
#[derive(Clone)]
pub struct Dispatcher {
    session: Arc<Session>,
    fallback: Arc<dyn ExecutionService>,
    deadline: Option<Duration>,
}

impl Dispatcher {
    pub fn new(session: Arc<Session>, fallback: Arc<dyn ExecutionService>) -> Self {
        Self {
            session,
            fallback,
            deadline: Some(DEFAULT_DISPATCH_TIMEOUT),
        }
    }

    /// Set the channel result deadline. `None` waits indefinitely.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Build a request carrying the next dispatch id
    pub fn next_request(&self, server_id: ServerId, command: &str) -> CommandRequest {
        CommandRequest::new(server_id, command, self.session.next_dispatch_id())
    }

    /// Build and dispatch in one step
    pub async fn submit(
        &self,
        server_id: ServerId,
        command: &str,
    ) -> Result<CommandOutcome, DispatchError> {
        let request = self.next_request(server_id, command);
        self.dispatch(request).await
    }

    /// Run one command on one server.
    ///
    /// Validation failures return before any network call or history entry.
    pub async fn dispatch(&self, request: CommandRequest) -> Result<CommandOutcome, DispatchError> {
        if self.session.is_closed() {
            return Err(DispatchError::SessionClosed);
        }
        if request.command_text.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        if !self.session.is_connected(request.server_id) {
            return Err(DispatchError::ServerNotConnected(request.server_id));
        }

        self.session.record_history(&request.command_text);

        if self.session.is_channel_open() {
            if let Some(rx) = self.send_over_channel(&request).await? {
                return self.await_result(&request, rx).await;
            }
        }
        self.dispatch_fallback(&request).await
    }

    /// `Ok(None)` means the channel is gone and the fallback should run
    async fn send_over_channel(
        &self,
        request: &CommandRequest,
    ) -> Result<Option<PendingReceiver>, DispatchError> {
        let rx = match self
            .session
            .register_pending(request.server_id, request.dispatch_id)
        {
            Ok(rx) => rx,
            Err(DispatchError::ChannelLost) => return Ok(None),
            Err(e) => return Err(e),
        };

        match self
            .session
            .send_execute(request.server_id, &request.command_text)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    server_id = %request.server_id,
                    dispatch_id = %request.dispatch_id,
                    "Command sent over channel"
                );
                Ok(Some(rx))
            }
            Err(e) => {
                self.session
                    .withdraw_pending(request.server_id, request.dispatch_id);
                tracing::debug!(
                    server_id = %request.server_id,
                    dispatch_id = %request.dispatch_id,
                    "Channel send failed, using fallback: {}",
                    e
                );
                Ok(None)
            }
        }
    }

    async fn await_result(
        &self,
        request: &CommandRequest,
        rx: PendingReceiver,
    ) -> Result<CommandOutcome, DispatchError> {
        let received = match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(
                        server_id = %request.server_id,
                        dispatch_id = %request.dispatch_id,
                        "No command result within {:?}",
                        deadline
                    );
                    return Err(DispatchError::DispatchTimedOut {
                        server_id: request.server_id,
                        dispatch_id: request.dispatch_id,
                    });
                }
            },
            None => rx.await,
        };

        received.unwrap_or(Err(DispatchError::SessionClosed))
    }

    async fn dispatch_fallback(
        &self,
        request: &CommandRequest,
    ) -> Result<CommandOutcome, DispatchError> {
        tracing::debug!(
            server_id = %request.server_id,
            dispatch_id = %request.dispatch_id,
            "Dispatching through fallback"
        );

        match self
            .fallback
            .execute(request.server_id, &request.command_text)
            .await
        {
            Ok(message) => {
                let outcome =
                    CommandOutcome::new(request.server_id, true, message.clone(), message);
                self.session.append_outcome(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    server_id = %request.server_id,
                    dispatch_id = %request.dispatch_id,
                    "Fallback execution failed: {}",
                    e
                );
                Err(DispatchError::RemoteCallFailed(e))
            }
        }
    }
}
