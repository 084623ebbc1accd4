//! Server registry commands

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use super::open_switchboard;
use crate::output::{format_servers, print_error, print_info, print_success};
use sb_client::rest::ServerDraft;
use sb_core::config::ClientConfig;
use sb_protocol::{ServerId, ServerMessage, ServerType};

/// How long `connect`/`disconnect` wait for the status update
const STATUS_WAIT: Duration = Duration::from_secs(15);

/// Server fields accepted by `add` and `edit`
#[derive(Args, Clone)]
pub struct ServerFields {
    /// Display name
    #[arg(long)]
    pub name: Option<String>,
    /// Host name or address
    #[arg(long)]
    pub host: Option<String>,
    /// Port number
    #[arg(long)]
    pub port: Option<u16>,
    /// Server kind (github, playwright, api, gitlab, postgres, redis, sqlite)
    #[arg(long = "type")]
    pub server_type: Option<ServerType>,
    /// API key passed to the server
    #[arg(long, env = "MCP_SWITCHBOARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// List servers
pub async fn servers_command(config: &ClientConfig) -> Result<()> {
    let switchboard = open_switchboard(config).await?;
    let servers = switchboard
        .refresh_servers(Duration::from_secs(5))
        .await
        .context("Failed to load servers")?;

    println!("{}", format_servers(&servers, switchboard.session().selected()));
    switchboard.close().await;
    Ok(())
}

pub async fn add_command(config: &ClientConfig, fields: ServerFields) -> Result<()> {
    let (Some(name), Some(host), Some(port)) = (fields.name, fields.host, fields.port) else {
        bail!("--name, --host and --port are required");
    };
    let draft = ServerDraft {
        name,
        host,
        port,
        server_type: fields.server_type.unwrap_or_default(),
        api_key: fields.api_key,
    };

    let switchboard = open_switchboard(config).await?;
    let result = switchboard.create_server(&draft).await;
    switchboard.close().await;

    let server = result.context("Failed to create server")?;
    print_success(&format!("Created server {} ({})", server.name, server.id));
    Ok(())
}

pub async fn edit_command(config: &ClientConfig, id: ServerId, fields: ServerFields) -> Result<()> {
    let switchboard = open_switchboard(config).await?;

    let Some(current) = switchboard.session().server(id) else {
        switchboard.close().await;
        bail!("Unknown server: {}", id);
    };
    let draft = ServerDraft {
        name: fields.name.unwrap_or(current.name),
        host: fields.host.unwrap_or(current.host),
        port: fields.port.unwrap_or(current.port),
        server_type: fields.server_type.unwrap_or(current.server_type),
        api_key: fields.api_key.or(current.api_key),
    };

    let result = switchboard.update_server(id, &draft).await;
    switchboard.close().await;

    let server = result.context("Failed to update server")?;
    print_success(&format!("Updated server {} ({})", server.name, server.id));
    Ok(())
}

pub async fn remove_command(config: &ClientConfig, id: ServerId) -> Result<()> {
    let switchboard = open_switchboard(config).await?;
    let result = switchboard.delete_server(id).await;
    switchboard.close().await;

    match result {
        Ok(()) => {
            print_success(&format!("Deleted server {}", id));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Failed to delete server: {}", e));
            Err(e.into())
        }
    }
}

pub async fn connect_command(config: &ClientConfig, id: ServerId) -> Result<()> {
    change_status(config, id, true).await
}

pub async fn disconnect_command(config: &ClientConfig, id: ServerId) -> Result<()> {
    change_status(config, id, false).await
}

/// Send a connect/disconnect request and wait for the matching status update
async fn change_status(config: &ClientConfig, id: ServerId, connect: bool) -> Result<()> {
    let switchboard = open_switchboard(config).await?;
    let session = switchboard.session();
    let mut events = session.subscribe();

    let sent = if connect {
        session.connect_server(id).await
    } else {
        session.disconnect_server(id).await
    };
    if let Err(e) = sent {
        switchboard.close().await;
        bail!("Cannot change server status: {}", e);
    }
    print_info(&format!(
        "{} server {}...",
        if connect { "Connecting" } else { "Disconnecting" },
        id
    ));

    let waited = tokio::time::timeout(STATUS_WAIT, async {
        loop {
            match events.recv().await {
                Ok(ServerMessage::ServerStatusUpdate {
                    server_id,
                    status,
                    message,
                }) if server_id == id => return Some((status, message)),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;
    switchboard.close().await;

    match waited {
        Ok(Some((status, message))) if status == connect => {
            print_success(if message.is_empty() {
                "Done"
            } else {
                message.as_str()
            });
            Ok(())
        }
        Ok(Some((_, message))) => bail!("Server {} reported: {}", id, message),
        Ok(None) => bail!("Channel closed before server {} answered", id),
        Err(_) => bail!("No status update from server {} within {:?}", id, STATUS_WAIT),
    }
}
