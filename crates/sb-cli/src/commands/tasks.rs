//! Stored task commands

use anyhow::{Context, Result};

use super::management_client;
use crate::output::{format_tasks, print_success};
use sb_client::rest::TaskDraft;
use sb_core::config::ClientConfig;
use sb_protocol::ServerId;

pub async fn tasks_list(config: &ClientConfig) -> Result<()> {
    let tasks = management_client(config)?
        .list_tasks()
        .await
        .context("Failed to list tasks")?;
    println!("{}", format_tasks(&tasks));
    Ok(())
}

pub async fn task_create(
    config: &ClientConfig,
    name: &str,
    server_id: ServerId,
    command: &str,
) -> Result<()> {
    let draft = TaskDraft {
        name: name.to_string(),
        command: command.to_string(),
        server_id,
    };
    let task = management_client(config)?
        .create_task(&draft)
        .await
        .context("Failed to create task")?;
    print_success(&format!("Created task {} ({})", task.name, task.id));
    Ok(())
}

pub async fn task_delete(config: &ClientConfig, id: u64) -> Result<()> {
    management_client(config)?
        .delete_task(id)
        .await
        .with_context(|| format!("Failed to delete task {}", id))?;
    print_success(&format!("Deleted task {}", id));
    Ok(())
}

pub async fn task_run(config: &ClientConfig, id: u64) -> Result<()> {
    let response = management_client(config)?
        .run_task(id)
        .await
        .with_context(|| format!("Failed to run task {}", id))?;

    match response.get("message").and_then(|m| m.as_str()) {
        Some(message) => print_success(message),
        None => print_success(&format!("Task {} started", id)),
    }
    Ok(())
}
