//! sb-core: Core abstractions and configuration for MCP Switchboard
//!
//! This crate provides the domain types, error taxonomy, configuration
//! structures and command-history store shared by the client library and
//! the CLI.

pub mod config;
pub mod error;
pub mod history;
pub mod time;
pub mod types;

pub use error::{BatchError, DispatchError, RemoteError, SwitchboardError};
pub use history::{CappedHistory, CommandHistory, FileHistory, DEFAULT_HISTORY_CAPACITY};
pub use types::{BatchFailure, CommandOutcome, CommandRequest, DispatchId, ExecutionMode};
