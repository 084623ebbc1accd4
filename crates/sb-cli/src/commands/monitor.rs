//! Logs, metrics and live event commands

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::error::RecvError;

use super::{management_client, open_switchboard};
use crate::output::{format_logs, format_metrics, print_info, print_warning};
use sb_core::config::ClientConfig;
use sb_core::time::now_string;
use sb_protocol::{ServerId, ServerMessage};

pub async fn logs_command(config: &ClientConfig, id: ServerId) -> Result<()> {
    let api = management_client(config)?;
    let logs = api
        .server_logs(id)
        .await
        .with_context(|| format!("Failed to fetch logs for server {}", id))?;
    println!("{}", format_logs(&logs));
    Ok(())
}

pub async fn metrics_command(config: &ClientConfig, id: ServerId) -> Result<()> {
    let api = management_client(config)?;
    let metrics = api
        .server_metrics(id)
        .await
        .with_context(|| format!("Failed to fetch metrics for server {}", id))?;
    print!("{}", format_metrics(id, &metrics));
    Ok(())
}

/// Print channel events until Ctrl+C or the channel closes
pub async fn watch_command(config: &ClientConfig) -> Result<()> {
    let switchboard = open_switchboard(config).await?;
    if !switchboard.is_online() {
        switchboard.close().await;
        bail!("Push channel unavailable; nothing to watch");
    }

    let mut events = switchboard.session().subscribe();
    print_info("Watching switchboard events (Ctrl+C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, stopping watch");
                break;
            }
            event = events.recv() => match event {
                Ok(message) => println!("[{}] {}", now_string(), describe(&message)),
                Err(RecvError::Lagged(skipped)) => {
                    print_warning(&format!("Skipped {} event(s)", skipped));
                }
                Err(RecvError::Closed) => break,
            },
        }

        if !switchboard.is_online() {
            print_warning("Push channel closed");
            break;
        }
    }

    switchboard.close().await;
    Ok(())
}

fn describe(message: &ServerMessage) -> String {
    match message {
        ServerMessage::ServerList { servers } => {
            format!("server list: {} server(s)", servers.len())
        }
        ServerMessage::ServerStatusUpdate {
            server_id,
            status,
            message,
        } => format!(
            "server {} {}: {}",
            server_id,
            if *status { "connected" } else { "disconnected" },
            message
        ),
        ServerMessage::CommandResult {
            server_id,
            success,
            output,
            message,
        } => format!(
            "result from {} {}: {}",
            server_id,
            if *success { "OK" } else { "ERR" },
            (if output.is_empty() { message } else { output }).trim_end()
        ),
        ServerMessage::Other(value) => value.to_string(),
    }
}
