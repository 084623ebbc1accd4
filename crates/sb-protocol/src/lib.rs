//! sb-protocol: Channel message types for the MCP Switchboard client
//!
//! This crate defines the JSON envelopes exchanged with the switchboard
//! backend over the push channel, and the server record they carry.

pub mod error;
pub mod message;
pub mod server;

pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage};
pub use server::{Server, ServerId, ServerType};
