//! mcp-switchboard: Command-line client for MCP Switchboard
//!
//! Lists and edits registered MCP servers, connects them, and dispatches
//! single commands or batches through the switchboard client.

pub mod commands;
pub mod output;
