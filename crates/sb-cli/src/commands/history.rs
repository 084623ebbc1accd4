//! History command implementation

use anyhow::{Context, Result};

use crate::output::{format_history, print_success};
use sb_core::config::ClientConfig;
use sb_core::{CommandHistory, FileHistory};

/// Show, filter or clear the persisted command history
pub fn history_command(config: &ClientConfig, filter: Option<&str>, clear: bool) -> Result<()> {
    let mut history = FileHistory::open(&config.history_path, config.history_capacity);

    if clear {
        history
            .clear()
            .with_context(|| format!("Failed to clear history at {:?}", history.path()))?;
        print_success("Command history cleared");
        return Ok(());
    }

    let entries = match filter {
        Some(needle) => history.filter(needle),
        None => history.to_list(),
    };
    println!("{}", format_history(&entries));
    Ok(())
}
