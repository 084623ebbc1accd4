//! In-process loopback channel
//!
//! `MemoryChannel` records every outgoing message and lets the caller push
//! inbound messages by hand, or have them produced by a responder closure.
//! Useful for embedding the session without a backend and for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use sb_core::error::ChannelError;
use sb_protocol::{ClientMessage, ServerMessage};

use super::{Channel, INBOUND_CAPACITY};

type Responder = Box<dyn Fn(&ClientMessage) -> Vec<ServerMessage> + Send + Sync>;

/// Loopback [`Channel`] backed by an in-memory queue
pub struct MemoryChannel {
    open: AtomicBool,
    sent: Mutex<Vec<ClientMessage>>,
    inbound: Mutex<Option<mpsc::Sender<ServerMessage>>>,
    responder: Mutex<Option<Responder>>,
}

impl MemoryChannel {
    /// Create an open channel and its inbound receiver
    pub fn new() -> (Arc<Self>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let channel = Arc::new(Self {
            open: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            inbound: Mutex::new(Some(tx)),
            responder: Mutex::new(None),
        });
        (channel, rx)
    }

    /// Create a channel that answers each sent message with whatever
    /// `responder` returns
    pub fn with_responder<F>(responder: F) -> (Arc<Self>, mpsc::Receiver<ServerMessage>)
    where
        F: Fn(&ClientMessage) -> Vec<ServerMessage> + Send + Sync + 'static,
    {
        let (channel, rx) = Self::new();
        *channel.responder.lock() = Some(Box::new(responder));
        (channel, rx)
    }

    /// Deliver an inbound message as if the backend had pushed it.
    ///
    /// Returns `false` if the channel has been closed.
    pub async fn push(&self, message: ServerMessage) -> bool {
        let tx = self.inbound.lock().clone();
        match tx {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }

    /// Every message sent so far, in order
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().clone()
    }

    /// Number of messages sent so far
    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of `execute_command` messages sent so far
    pub fn execute_count(&self) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|m| matches!(m, ClientMessage::ExecuteCommand { .. }))
            .count()
    }

    /// Flip the open flag without ending the inbound stream
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn send(&self, message: ClientMessage) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }

        let replies = self
            .responder
            .lock()
            .as_ref()
            .map(|respond| respond(&message))
            .unwrap_or_default();
        self.sent.lock().push(message);

        for reply in replies {
            if !self.push(reply).await {
                tracing::debug!("Loopback reply dropped, inbound queue closed");
            }
        }
        Ok(())
    }

    async fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.inbound.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_protocol::ServerId;

    #[tokio::test]
    async fn test_records_sent_messages() {
        let (channel, _rx) = MemoryChannel::new();
        channel.send(ClientMessage::GetServerList).await.unwrap();
        channel
            .send(ClientMessage::ConnectServer {
                server_id: ServerId(3),
            })
            .await
            .unwrap();

        assert_eq!(channel.send_count(), 2);
        assert_eq!(channel.sent()[0], ClientMessage::GetServerList);
    }

    #[tokio::test]
    async fn test_responder_replies_arrive_inbound() {
        let (channel, mut rx) = MemoryChannel::with_responder(|msg| match msg {
            ClientMessage::ExecuteCommand { server_id, command } => {
                vec![ServerMessage::CommandResult {
                    server_id: *server_id,
                    success: true,
                    output: format!("ran {}", command),
                    message: String::new(),
                }]
            }
            _ => Vec::new(),
        });

        channel
            .send(ClientMessage::ExecuteCommand {
                server_id: ServerId(1),
                command: "ls".to_string(),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(ServerMessage::CommandResult { output, .. }) => assert_eq!(output, "ran ls"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_rejects_sends_and_ends_stream() {
        let (channel, mut rx) = MemoryChannel::new();
        channel.close().await;

        assert!(!channel.is_open());
        assert!(matches!(
            channel.send(ClientMessage::GetServerList).await,
            Err(ChannelError::Closed)
        ));
        assert!(rx.recv().await.is_none());
        assert!(!channel.push(ServerMessage::Other(serde_json::json!({}))).await);
    }
}
