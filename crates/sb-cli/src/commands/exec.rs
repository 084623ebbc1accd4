//! Command dispatch: single commands and batches

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use super::open_switchboard;
use crate::output::{
    format_failures, format_outcomes, print_error, print_info, print_success, print_warning,
};
use sb_client::{BatchJob, Switchboard};
use sb_core::config::ClientConfig;
use sb_core::{BatchError, ExecutionMode};
use sb_protocol::ServerId;

/// Destination of `--export`; `-` is stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Stdout,
    File(PathBuf),
}

impl std::str::FromStr for ExportTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "-" => ExportTarget::Stdout,
            path => ExportTarget::File(PathBuf::from(path)),
        })
    }
}

/// Options for `batch`
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Target server (repeatable)
    #[arg(short, long = "server", value_name = "ID")]
    pub servers: Vec<ServerId>,

    /// Target every connected server
    #[arg(long, conflicts_with = "servers")]
    pub all_connected: bool,

    /// sequential stops at the first failure; parallel runs everything
    #[arg(short, long, default_value_t = ExecutionMode::Sequential)]
    pub mode: ExecutionMode,

    /// Read commands from a file, one per line
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Write the execution log to FILE, or to stdout with `-`
    #[arg(long, value_name = "FILE")]
    pub export: Option<ExportTarget>,

    /// Commands to run, in order
    pub commands: Vec<String>,
}

/// Human-readable output. Moves to stderr when stdout carries the export.
#[derive(Clone, Copy)]
struct Console {
    stdout_taken: bool,
}

impl Console {
    fn for_export(export: Option<&ExportTarget>) -> Self {
        Self {
            stdout_taken: matches!(export, Some(ExportTarget::Stdout)),
        }
    }

    fn line(&self, text: &str) {
        if self.stdout_taken {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }

    fn info(&self, msg: &str) {
        if self.stdout_taken {
            eprintln!("ℹ {}", msg);
        } else {
            print_info(msg);
        }
    }

    fn success(&self, msg: &str) {
        if self.stdout_taken {
            eprintln!("✓ {}", msg);
        } else {
            print_success(msg);
        }
    }
}

/// Run one command on one server and print its output
pub async fn exec_command(
    config: &ClientConfig,
    server_id: ServerId,
    command: &[String],
    export: Option<&ExportTarget>,
) -> Result<()> {
    let console = Console::for_export(export);
    let command = command.join(" ");
    let switchboard = open_switchboard(config).await?;
    let result = switchboard.exec(server_id, &command).await;
    finish(&switchboard, export, console).await?;

    let outcome = result.with_context(|| format!("Failed to run '{}' on {}", command, server_id))?;
    let text = if outcome.output.is_empty() {
        &outcome.message
    } else {
        &outcome.output
    };
    console.line(text.trim_end());

    if !outcome.success {
        bail!("Command failed on server {}", server_id);
    }
    Ok(())
}

/// Run a batch of commands across servers
pub async fn batch_command(config: &ClientConfig, args: BatchArgs) -> Result<()> {
    let console = Console::for_export(args.export.as_ref());
    let mut script = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read command file: {:?}", path))?,
        None => String::new(),
    };
    for command in &args.commands {
        script.push('\n');
        script.push_str(command);
    }

    let switchboard = open_switchboard(config).await?;
    let targets = if args.all_connected {
        switchboard.session().connected_ids()
    } else {
        args.servers.clone()
    };
    let job = BatchJob::from_script(&script, targets, args.mode);

    console.info(&format!(
        "Running {} command(s) on {} server(s) ({})",
        job.commands().len(),
        job.targets().len(),
        job.mode()
    ));
    let result = switchboard.run_batch(job).await;
    finish(&switchboard, args.export.as_ref(), console).await?;

    match result {
        Ok(report) => {
            console.line(&format_outcomes(&report.outcomes));
            console.success(&format!("{} dispatch(es) succeeded", report.outcomes.len()));
            Ok(())
        }
        Err(BatchError::BatchAborted { completed, failure }) => {
            if !completed.is_empty() {
                console.line(&format_outcomes(&completed));
            }
            print_error(&format!("Batch aborted: {}", failure));
            bail!("Batch aborted after {} successful dispatch(es)", completed.len())
        }
        Err(BatchError::PartialBatchFailure {
            failed,
            failures,
            succeeded,
        }) => {
            if !succeeded.is_empty() {
                console.line(&format_outcomes(&succeeded));
            }
            console.line(&format_failures(&failures));
            bail!("{} of {} dispatch(es) failed", failed, failed + succeeded.len())
        }
        Err(e) => Err(e.into()),
    }
}

/// Close the session, then export the ledger if asked.
///
/// Both targets receive exactly [`sb_client::Session::export_ledger`].
async fn finish(
    switchboard: &Switchboard,
    export: Option<&ExportTarget>,
    console: Console,
) -> Result<()> {
    switchboard.close().await;
    let Some(target) = export else {
        return Ok(());
    };

    let text = switchboard.session().export_ledger();
    if text.is_empty() {
        print_warning("Nothing to export");
    }
    match target {
        ExportTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write execution log to stdout")?;
        }
        ExportTarget::File(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write execution log to {:?}", path))?;
            console.info(&format!("Execution log written to {:?}", path));
        }
    }
    Ok(())
}
