//! sb-client: Server-state synchronization and command dispatch
//!
//! The client keeps a registry of MCP servers in sync with the backend's
//! push channel, dispatches commands over that channel (falling back to the
//! REST service when it is down), and records results in an execution
//! ledger.

pub mod batch;
pub mod channel;
pub mod dispatcher;
pub mod ledger;
pub mod pending;
pub mod registry;
pub mod rest;
pub mod session;
pub mod switchboard;
pub mod system_log;

pub use batch::{BatchCoordinator, BatchJob, BatchReport};
pub use channel::{Channel, MemoryChannel, OfflineChannel, WsChannel};
pub use dispatcher::{Dispatcher, ExecutionService};
pub use ledger::ExecutionLedger;
pub use registry::ServerRegistry;
pub use rest::ManagementClient;
pub use session::Session;
pub use switchboard::Switchboard;
pub use system_log::SystemLog;
