//! Session context
//!
//! A [`Session`] owns the push channel and all state derived from it: the
//! server registry, the execution ledger, the system message log and the
//! pending dispatch table. Inbound messages are applied by a single pump
//! task in arrival order.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use sb_core::error::HistoryError;
use sb_core::{CommandHistory, CommandOutcome, DispatchError, DispatchId};
use sb_protocol::{ClientMessage, Server, ServerId, ServerMessage};

use crate::channel::Channel;
use crate::ledger::ExecutionLedger;
use crate::pending::{PendingDispatches, PendingReceiver};
use crate::registry::ServerRegistry;
use crate::system_log::SystemLog;

/// Capacity of the event broadcast used by [`Session::subscribe`]
const EVENT_CAPACITY: usize = 1024;

/// State touched by the pump and by dispatching callers
#[derive(Default)]
struct SessionState {
    registry: ServerRegistry,
    ledger: ExecutionLedger,
    system_log: SystemLog,
    pending: PendingDispatches,
    /// Set once the backend hung up; no further slots are accepted
    channel_lost: bool,
}

/// Owned client context for one connection to the backend
pub struct Session {
    channel: Arc<dyn Channel>,
    state: Mutex<SessionState>,
    history: Mutex<Box<dyn CommandHistory>>,
    next_dispatch: AtomicU64,
    events: broadcast::Sender<ServerMessage>,
    snapshots: watch::Sender<u64>,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl Session {
    /// Wrap an open channel and start applying its inbound messages.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        channel: Arc<dyn Channel>,
        inbound: mpsc::Receiver<ServerMessage>,
        history: Box<dyn CommandHistory>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshots, _) = watch::channel(0);
        let cancel = CancellationToken::new();

        let session = Arc::new(Self {
            channel,
            state: Mutex::new(SessionState::default()),
            history: Mutex::new(history),
            next_dispatch: AtomicU64::new(1),
            events,
            snapshots,
            closed: AtomicBool::new(false),
            cancel: cancel.clone(),
        });

        tokio::spawn(pump(Arc::downgrade(&session), inbound, cancel));
        session
    }

    /// Apply one inbound message, then broadcast it to subscribers
    pub fn handle_message(&self, message: ServerMessage) {
        {
            let mut state = self.state.lock();
            match &message {
                ServerMessage::ServerList { servers } => {
                    tracing::debug!("Applying snapshot of {} server(s)", servers.len());
                    state.registry.apply_snapshot(servers.clone());
                }
                ServerMessage::ServerStatusUpdate {
                    server_id,
                    status,
                    message: text,
                } => {
                    state.registry.apply_status_patch(*server_id, *status);
                    let line = if text.is_empty() {
                        format!(
                            "Server {} {}",
                            server_id,
                            if *status { "connected" } else { "disconnected" }
                        )
                    } else {
                        text.clone()
                    };
                    state.system_log.push(line);
                }
                ServerMessage::CommandResult {
                    server_id,
                    success,
                    output,
                    message: text,
                } => {
                    let outcome =
                        CommandOutcome::new(*server_id, *success, output.clone(), text.clone());
                    state.ledger.append(outcome.clone());
                    if state.pending.resolve_next(*server_id, outcome).is_none() {
                        tracing::debug!(server_id = %server_id, "Uncorrelated command result");
                    }
                }
                ServerMessage::Other(value) => {
                    tracing::debug!(kind = message.kind(), "Passthrough message");
                    state.system_log.push(value.to_string());
                }
            }
        }

        if matches!(message, ServerMessage::ServerList { .. }) {
            self.snapshots.send_modify(|count| *count += 1);
        }
        let _ = self.events.send(message);
    }

    /// Receive every inbound message applied after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }

    /// Wait until at least one `server_list` snapshot has been applied.
    ///
    /// Returns `false` if none arrived within `timeout`.
    pub async fn wait_for_snapshot(&self, timeout: Duration) -> bool {
        self.wait_for_snapshot_after(0, timeout).await
    }

    /// Wait until more than `seen` snapshots have been applied
    pub async fn wait_for_snapshot_after(&self, seen: u64, timeout: Duration) -> bool {
        let mut rx = self.snapshots.subscribe();
        let arrived = tokio::time::timeout(timeout, rx.wait_for(|count| *count > seen))
            .await
            .map(|waited| waited.is_ok());
        matches!(arrived, Ok(true))
    }

    /// Number of `server_list` snapshots applied so far
    pub fn snapshot_count(&self) -> u64 {
        *self.snapshots.borrow()
    }

    // Registry

    pub fn servers(&self) -> Vec<Server> {
        self.state.lock().registry.list().to_vec()
    }

    pub fn server(&self, id: ServerId) -> Option<Server> {
        self.state.lock().registry.get(id).cloned()
    }

    pub fn selected(&self) -> Option<ServerId> {
        self.state.lock().registry.selected()
    }

    /// Select a server; unknown ids leave the selection unchanged
    pub fn select(&self, id: ServerId) -> bool {
        self.state.lock().registry.select(id)
    }

    pub fn is_connected(&self, id: ServerId) -> bool {
        self.state.lock().registry.is_connected(id)
    }

    pub fn connected_ids(&self) -> Vec<ServerId> {
        self.state.lock().registry.connected_ids()
    }

    /// Seed the registry without a channel snapshot
    pub fn apply_snapshot(&self, servers: Vec<Server>) {
        self.state.lock().registry.apply_snapshot(servers);
    }

    /// Record an acknowledged create
    pub fn apply_created(&self, server: Server) {
        self.state.lock().registry.upsert(server);
    }

    /// Record an acknowledged update
    pub fn apply_updated(&self, server: Server) {
        self.state.lock().registry.upsert(server);
    }

    /// Record an acknowledged delete
    pub fn apply_deleted(&self, id: ServerId) {
        self.state.lock().registry.remove(id);
    }

    // Ledger and logs

    pub fn ledger_entries(&self) -> Vec<CommandOutcome> {
        self.state.lock().ledger.entries().to_vec()
    }

    pub fn export_ledger(&self) -> String {
        self.state.lock().ledger.export_as_text()
    }

    /// Empty the ledger display buffer. Command history is untouched.
    pub fn clear_console(&self) {
        self.state.lock().ledger.clear_display();
    }

    pub fn system_messages(&self) -> Vec<String> {
        self.state.lock().system_log.snapshot()
    }

    pub(crate) fn append_outcome(&self, outcome: CommandOutcome) {
        self.state.lock().ledger.append(outcome);
    }

    // History

    /// Command history, most recent first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().to_list()
    }

    pub fn filter_history(&self, needle: &str) -> Vec<String> {
        self.history.lock().filter(needle)
    }

    pub fn clear_history(&self) -> Result<(), HistoryError> {
        self.history.lock().clear()
    }

    /// Push a command to history. Store failures are logged, not returned.
    pub fn record_history(&self, command: &str) {
        if let Err(e) = self.history.lock().push(command) {
            tracing::warn!("Failed to record command history: {}", e);
        }
    }

    // Channel

    pub fn is_channel_open(&self) -> bool {
        !self.is_closed() && self.channel.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Ask the backend for a fresh `server_list`
    pub async fn request_server_list(&self) -> Result<(), DispatchError> {
        self.send_control(ClientMessage::GetServerList).await
    }

    pub async fn connect_server(&self, server_id: ServerId) -> Result<(), DispatchError> {
        tracing::info!(server_id = %server_id, "Requesting connect");
        self.send_control(ClientMessage::ConnectServer { server_id })
            .await
    }

    pub async fn disconnect_server(&self, server_id: ServerId) -> Result<(), DispatchError> {
        tracing::info!(server_id = %server_id, "Requesting disconnect");
        self.send_control(ClientMessage::DisconnectServer { server_id })
            .await
    }

    async fn send_control(&self, message: ClientMessage) -> Result<(), DispatchError> {
        if !self.is_channel_open() {
            return Err(DispatchError::ChannelUnavailable);
        }
        self.channel.send(message).await.map_err(|e| {
            tracing::debug!("Control message not sent: {}", e);
            DispatchError::ChannelUnavailable
        })
    }

    /// Allocate the next dispatch id
    pub fn next_dispatch_id(&self) -> DispatchId {
        DispatchId(self.next_dispatch.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of dispatches awaiting a channel result
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub(crate) fn register_pending(
        &self,
        server_id: ServerId,
        dispatch_id: DispatchId,
    ) -> Result<PendingReceiver, DispatchError> {
        // `close` flips `closed` before taking this lock to fail slots, so a
        // slot registered here is either refused or failed later.
        let mut state = self.state.lock();
        if self.is_closed() {
            return Err(DispatchError::SessionClosed);
        }
        if state.channel_lost {
            return Err(DispatchError::ChannelLost);
        }
        Ok(state.pending.register(server_id, dispatch_id))
    }

    /// The backend ended the channel while the session is still open
    fn mark_channel_lost(&self) {
        let mut state = self.state.lock();
        state.channel_lost = true;
        let failed = state.pending.len();
        state.pending.fail_all(DispatchError::ChannelLost);
        tracing::warn!(failed, "Channel lost, pending dispatches failed");
    }

    pub(crate) fn withdraw_pending(&self, server_id: ServerId, dispatch_id: DispatchId) {
        self.state.lock().pending.withdraw(server_id, dispatch_id);
    }

    pub(crate) async fn send_execute(
        &self,
        server_id: ServerId,
        command: &str,
    ) -> Result<(), sb_core::error::ChannelError> {
        self.channel
            .send(ClientMessage::ExecuteCommand {
                server_id,
                command: command.to_string(),
            })
            .await
    }

    /// Close the channel and resolve every pending dispatch with
    /// [`DispatchError::SessionClosed`]. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Closing session");
        self.cancel.cancel();
        self.channel.close().await;
        self.state.lock().pending.fail_all(DispatchError::SessionClosed);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Apply inbound messages until the channel ends or the session goes away
async fn pump(
    session: Weak<Session>,
    mut inbound: mpsc::Receiver<ServerMessage>,
    cancel: CancellationToken,
) {
    let hung_up = loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break false,
            message = inbound.recv() => match message {
                Some(message) => message,
                None => {
                    tracing::info!("Inbound channel ended");
                    break true;
                }
            },
        };

        let Some(session) = session.upgrade() else {
            break false;
        };
        tracing::trace!(kind = message.kind(), "Applying inbound message");
        session.handle_message(message);
    };

    // A local close fails its own slots
    if hung_up {
        if let Some(session) = session.upgrade() {
            if !session.is_closed() {
                session.mark_channel_lost();
            }
        }
    }
}
