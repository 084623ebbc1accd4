//! Output formatting utilities for the CLI
//!
//! Tables for servers, outcomes, logs and tasks, plus colored status
//! messages. API keys are never rendered.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use sb_client::rest::{LogEntry, ServerMetrics, Task};
use sb_core::time::format_timestamp;
use sb_core::{BatchFailure, CommandOutcome};
use sb_protocol::{Server, ServerId};

/// Format servers as a table, marking the selected one
pub fn format_servers(servers: &[Server], selected: Option<ServerId>) -> String {
    if servers.is_empty() {
        return "No servers registered".to_string();
    }

    #[derive(Tabled)]
    struct ServerRow {
        #[tabled(rename = "")]
        marker: &'static str,
        #[tabled(rename = "ID")]
        id: u64,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "TYPE")]
        server_type: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "STATUS")]
        status: &'static str,
    }

    let rows: Vec<ServerRow> = servers
        .iter()
        .map(|s| ServerRow {
            marker: if selected == Some(s.id) { "*" } else { "" },
            id: s.id.as_u64(),
            name: s.name.clone(),
            server_type: s.server_type.to_string(),
            address: s.address(),
            status: if s.status { "connected" } else { "disconnected" },
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format command outcomes in ledger order
pub fn format_outcomes(outcomes: &[CommandOutcome]) -> String {
    if outcomes.is_empty() {
        return "No results".to_string();
    }

    #[derive(Tabled)]
    struct OutcomeRow {
        #[tabled(rename = "TIME")]
        time: String,
        #[tabled(rename = "SERVER")]
        server: u64,
        #[tabled(rename = "RESULT")]
        result: &'static str,
        #[tabled(rename = "OUTPUT")]
        output: String,
    }

    let rows: Vec<OutcomeRow> = outcomes
        .iter()
        .map(|o| OutcomeRow {
            time: format_timestamp(&o.timestamp),
            server: o.server_id.as_u64(),
            result: if o.success { "OK" } else { "ERR" },
            output: if o.output.is_empty() {
                o.message.clone()
            } else {
                o.output.trim_end().to_string()
            },
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Format batch failures
pub fn format_failures(failures: &[BatchFailure]) -> String {
    #[derive(Tabled)]
    struct FailureRow {
        #[tabled(rename = "SERVER")]
        server: u64,
        #[tabled(rename = "COMMAND")]
        command: String,
        #[tabled(rename = "REASON")]
        reason: String,
    }

    let rows: Vec<FailureRow> = failures
        .iter()
        .map(|f| FailureRow {
            server: f.server_id.as_u64(),
            command: f.command.clone(),
            reason: f.reason.clone(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

pub fn format_logs(logs: &[LogEntry]) -> String {
    if logs.is_empty() {
        return "No log entries".to_string();
    }

    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "TIME")]
        time: String,
        #[tabled(rename = "COMMAND")]
        command: String,
        #[tabled(rename = "RESULT")]
        result: &'static str,
        #[tabled(rename = "OUTPUT")]
        output: String,
    }

    let rows: Vec<LogRow> = logs
        .iter()
        .map(|l| LogRow {
            time: l.timestamp.clone(),
            command: l.command.clone(),
            result: if l.success { "OK" } else { "ERR" },
            output: truncate(l.output.trim_end(), 60),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_metrics(server_id: ServerId, metrics: &ServerMetrics) -> String {
    let mut output = String::new();
    output.push_str(&format!("Server {} metrics\n", server_id));
    output.push_str(&format!("CPU:         {:.1}%\n", metrics.cpu_usage));
    output.push_str(&format!("Memory:      {:.1}%\n", metrics.memory_usage));
    output.push_str(&format!("Disk:        {:.1}%\n", metrics.disk_usage));
    output.push_str(&format!("Network in:  {:.2}\n", metrics.network_in));
    output.push_str(&format!("Network out: {:.2}\n", metrics.network_out));
    output
}

pub fn format_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks".to_string();
    }

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "ID")]
        id: u64,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "SERVER")]
        server: u64,
        #[tabled(rename = "COMMAND")]
        command: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "LAST RUN")]
        last_run: String,
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id,
            name: t.name.clone(),
            server: t.server_id.as_u64(),
            command: truncate(&t.command, 40),
            status: if t.status.is_empty() {
                "-".to_string()
            } else {
                t.status.clone()
            },
            last_run: t.last_run.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Numbered history list, most recent first
pub fn format_history(entries: &[String]) -> String {
    if entries.is_empty() {
        return "No command history".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, cmd)| format!("{:>3}  {}", i + 1, cmd))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to `max_len` characters with an ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
