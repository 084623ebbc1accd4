//! CLI command implementations

mod config;
mod exec;
mod history;
mod monitor;
mod servers;
mod tasks;

pub use config::{config_init, config_path, config_show, load_client_config};
pub use exec::{batch_command, exec_command, BatchArgs, ExportTarget};
pub use history::history_command;
pub use monitor::{logs_command, metrics_command, watch_command};
pub use servers::{
    add_command, connect_command, disconnect_command, edit_command, remove_command,
    servers_command, ServerFields,
};
pub use tasks::{task_create, task_delete, task_run, tasks_list};

use std::time::Duration;

use anyhow::{Context, Result};

use crate::output::print_warning;
use sb_client::{ManagementClient, Switchboard};
use sb_core::config::ClientConfig;

/// How long to wait for the backend's first server list
const SNAPSHOT_WAIT: Duration = Duration::from_secs(5);

/// Connect a switchboard and make sure its registry is populated
pub async fn open_switchboard(config: &ClientConfig) -> Result<Switchboard> {
    let switchboard = Switchboard::connect(config)
        .await
        .context("Failed to start switchboard client")?;

    if switchboard.is_online() {
        if !switchboard.session().wait_for_snapshot(SNAPSHOT_WAIT).await {
            print_warning("No server list received from the backend yet");
        }
    } else {
        print_warning("Push channel unavailable, commands will use the REST fallback");
    }
    Ok(switchboard)
}

/// REST client for commands that never touch the push channel
pub fn management_client(config: &ClientConfig) -> Result<ManagementClient> {
    ManagementClient::new(&config.api_url, config.request_timeout)
        .context("Failed to build HTTP client")
}
