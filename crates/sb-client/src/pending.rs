//! Pending dispatch table
//!
//! The backend does not echo a correlation token, so `command_result`
//! messages are matched per server in FIFO issue order. A slot whose caller
//! has given up stays queued so that the late result is absorbed by it
//! rather than by the next dispatch.

use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;

use sb_core::{CommandOutcome, DispatchError, DispatchId};
use sb_protocol::ServerId;

/// Receiving half handed to the dispatching caller
pub type PendingReceiver = oneshot::Receiver<Result<CommandOutcome, DispatchError>>;

struct PendingSlot {
    dispatch_id: DispatchId,
    tx: oneshot::Sender<Result<CommandOutcome, DispatchError>>,
}

/// Per-server FIFO queues of dispatches awaiting a result
#[derive(Default)]
pub struct PendingDispatches {
    queues: HashMap<ServerId, VecDeque<PendingSlot>>,
}

impl PendingDispatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a slot behind any earlier dispatches to the same server
    pub fn register(&mut self, server_id: ServerId, dispatch_id: DispatchId) -> PendingReceiver {
        let (tx, rx) = oneshot::channel();
        self.queues
            .entry(server_id)
            .or_default()
            .push_back(PendingSlot { dispatch_id, tx });
        rx
    }

    /// Resolve the oldest slot for `server_id` with `outcome`.
    ///
    /// Returns the dispatch id that was resolved, or `None` when nothing was
    /// waiting on that server.
    pub fn resolve_next(
        &mut self,
        server_id: ServerId,
        outcome: CommandOutcome,
    ) -> Option<DispatchId> {
        let queue = self.queues.get_mut(&server_id)?;
        let slot = queue.pop_front()?;
        if queue.is_empty() {
            self.queues.remove(&server_id);
        }

        if slot.tx.send(Ok(outcome)).is_err() {
            tracing::debug!(
                server_id = %server_id,
                dispatch_id = %slot.dispatch_id,
                "Late result absorbed by abandoned dispatch"
            );
        }
        Some(slot.dispatch_id)
    }

    /// Remove a slot whose request never left the client
    pub fn withdraw(&mut self, server_id: ServerId, dispatch_id: DispatchId) -> bool {
        let Some(queue) = self.queues.get_mut(&server_id) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|slot| slot.dispatch_id != dispatch_id);
        let removed = queue.len() != before;
        if queue.is_empty() {
            self.queues.remove(&server_id);
        }
        removed
    }

    /// Resolve every slot with `error`
    pub fn fail_all(&mut self, error: DispatchError) {
        for (_, queue) in self.queues.drain() {
            for slot in queue {
                let _ = slot.tx.send(Err(error.clone()));
            }
        }
    }

    /// Total number of waiting slots
    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
