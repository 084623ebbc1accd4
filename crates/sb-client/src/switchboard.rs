//! Top-level client facade
//!
//! [`Switchboard`] wires the session, the REST client, the dispatcher and
//! the batch coordinator together from a [`ClientConfig`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sb_core::config::ClientConfig;
use sb_core::error::RemoteError;
use sb_core::{
    BatchError, CommandHistory, CommandOutcome, DispatchError, FileHistory, SwitchboardError,
};
use sb_protocol::{Server, ServerId, ServerMessage};

use crate::batch::{BatchCoordinator, BatchJob, BatchReport};
use crate::channel::{Channel, OfflineChannel, WsChannel};
use crate::dispatcher::Dispatcher;
use crate::rest::{ManagementClient, ServerDraft};
use crate::session::Session;

/// Connected client: session state plus the ways to act on it
pub struct Switchboard {
    session: Arc<Session>,
    api: Arc<ManagementClient>,
    dispatcher: Dispatcher,
    batch: BatchCoordinator,
}

impl Switchboard {
    /// Open the push channel and the REST client described by `config`.
    ///
    /// An unreachable channel is not an error: the session runs offline,
    /// seeded from the REST server list, and dispatches use the fallback.
    pub async fn connect(config: &ClientConfig) -> Result<Self, SwitchboardError> {
        let api = ManagementClient::new(&config.api_url, config.request_timeout)?;
        let history = FileHistory::open(&config.history_path, config.history_capacity);

        let url = config.channel_url();
        let switchboard = match WsChannel::connect(&url).await {
            Ok((channel, inbound)) => {
                let switchboard =
                    Self::with_channel(config, api, Arc::new(channel), inbound, Box::new(history));
                if let Err(e) = switchboard.session.request_server_list().await {
                    tracing::debug!("Initial server list request not sent: {}", e);
                }
                switchboard
            }
            Err(e) => {
                tracing::warn!("Push channel unavailable, running offline: {}", e);
                let (_tx, inbound) = mpsc::channel(1);
                let switchboard = Self::with_channel(
                    config,
                    api,
                    Arc::new(OfflineChannel),
                    inbound,
                    Box::new(history),
                );
                match switchboard.api.list_servers().await {
                    Ok(servers) => switchboard.session.apply_snapshot(servers),
                    Err(e) => tracing::warn!("Could not load server list: {}", e),
                }
                switchboard
            }
        };

        Ok(switchboard)
    }

    /// Assemble a switchboard over an already-open channel
    pub fn with_channel(
        config: &ClientConfig,
        api: ManagementClient,
        channel: Arc<dyn Channel>,
        inbound: mpsc::Receiver<ServerMessage>,
        history: Box<dyn CommandHistory>,
    ) -> Self {
        let session = Session::open(channel, inbound, history);
        let api = Arc::new(api);
        let dispatcher = Dispatcher::new(Arc::clone(&session), api.clone())
            .with_deadline(config.dispatch_deadline());
        let batch = BatchCoordinator::new(dispatcher.clone());

        Self {
            session,
            api,
            dispatcher,
            batch,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &ManagementClient {
        &self.api
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn is_online(&self) -> bool {
        self.session.is_channel_open()
    }

    /// Run one command on one server
    pub async fn exec(
        &self,
        server_id: ServerId,
        command: &str,
    ) -> Result<CommandOutcome, DispatchError> {
        self.dispatcher.submit(server_id, command).await
    }

    pub async fn run_batch(&self, job: BatchJob) -> Result<BatchReport, BatchError> {
        self.batch.run_batch(job).await
    }

    /// Refresh the registry and return it.
    ///
    /// Over the channel this requests a snapshot and waits up to `wait` for
    /// it; offline it reads the REST list instead.
    pub async fn refresh_servers(&self, wait: Duration) -> Result<Vec<Server>, SwitchboardError> {
        if self.session.is_channel_open() {
            let seen = self.session.snapshot_count();
            self.session.request_server_list().await?;
            if !self.session.wait_for_snapshot_after(seen, wait).await {
                tracing::warn!("No server list within {:?}, showing cached registry", wait);
            }
        } else {
            let servers = self.api.list_servers().await?;
            self.session.apply_snapshot(servers);
        }
        Ok(self.session.servers())
    }

    /// Create a server and record it once acknowledged
    pub async fn create_server(&self, draft: &ServerDraft) -> Result<Server, RemoteError> {
        let server = self.api.create_server(draft).await?;
        self.session.apply_created(server.clone());
        Ok(server)
    }

    pub async fn update_server(
        &self,
        id: ServerId,
        draft: &ServerDraft,
    ) -> Result<Server, RemoteError> {
        let server = self.api.update_server(id, draft).await?;
        self.session.apply_updated(server.clone());
        Ok(server)
    }

    /// Delete a server. Refused without a network call while it is
    /// connected.
    pub async fn delete_server(&self, id: ServerId) -> Result<(), RemoteError> {
        if self.session.is_connected(id) {
            return Err(RemoteError::ServerConnected(id));
        }
        self.api.delete_server(id).await?;
        self.session.apply_deleted(id);
        Ok(())
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}
