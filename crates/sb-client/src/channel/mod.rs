//! Push channel abstraction
//!
//! A channel carries [`ClientMessage`]s out and delivers [`ServerMessage`]s
//! in, in arrival order, through the `mpsc::Receiver` returned when it is
//! opened. Channels do not reconnect: once closed they stay closed and the
//! dispatcher uses the REST fallback.

mod memory;
mod websocket;

pub use memory::MemoryChannel;
pub use websocket::WsChannel;

use async_trait::async_trait;

use sb_core::error::ChannelError;
use sb_protocol::ClientMessage;

/// Capacity of the inbound message queue
pub const INBOUND_CAPACITY: usize = 256;

/// Capacity of the outbound message queue
pub const OUTBOUND_CAPACITY: usize = 64;

/// Duplex connection to the switchboard backend
#[async_trait]
pub trait Channel: Send + Sync {
    /// Whether frames can currently be sent
    fn is_open(&self) -> bool;

    /// Queue a message for sending
    async fn send(&self, message: ClientMessage) -> Result<(), ChannelError>;

    /// Close the connection. Idempotent.
    async fn close(&self);
}

/// A channel that is never open. Used when the backend's push endpoint is
/// unreachable so every dispatch goes through the fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineChannel;

#[async_trait]
impl Channel for OfflineChannel {
    fn is_open(&self) -> bool {
        false
    }

    async fn send(&self, _message: ClientMessage) -> Result<(), ChannelError> {
        Err(ChannelError::Closed)
    }

    async fn close(&self) {}
}
