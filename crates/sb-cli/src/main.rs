//! MCP Switchboard CLI
//!
//! Single binary for managing MCP servers and dispatching commands:
//! - Registry management (servers, add, edit, remove, connect, disconnect)
//! - Command dispatch (exec, batch) with an exportable execution log
//! - Read-only views (history, logs, metrics, tasks, watch)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcp_switchboard::commands::{self, BatchArgs, ExportTarget, ServerFields};
use sb_protocol::ServerId;

#[derive(Parser)]
#[command(name = "mcp-switchboard")]
#[command(author, version, about = "Manage MCP servers and dispatch commands to them")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered servers
    #[command(alias = "ls")]
    Servers,

    /// Register a new server
    Add {
        #[command(flatten)]
        fields: ServerFields,
    },

    /// Change a registered server
    Edit {
        /// Server ID
        id: ServerId,
        #[command(flatten)]
        fields: ServerFields,
    },

    /// Delete a server (it must be disconnected)
    #[command(alias = "rm")]
    Remove {
        /// Server ID
        id: ServerId,
    },

    /// Ask the backend to connect a server
    Connect {
        /// Server ID
        id: ServerId,
    },

    /// Ask the backend to disconnect a server
    Disconnect {
        /// Server ID
        id: ServerId,
    },

    /// Run one command on one connected server
    Exec {
        /// Server ID
        id: ServerId,
        /// Command to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
        /// Write the execution log to FILE, or to stdout with `-`
        #[arg(long, value_name = "FILE")]
        export: Option<ExportTarget>,
    },

    /// Run several commands across several servers
    Batch(BatchArgs),

    /// Show the command history, most recent first
    History {
        /// Only show commands containing this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Forget every remembered command
        #[arg(long)]
        clear: bool,
    },

    /// Show a server's execution log from the management service
    Logs {
        /// Server ID
        id: ServerId,
    },

    /// Show a server's resource metrics
    Metrics {
        /// Server ID
        id: ServerId,
    },

    /// Manage stored tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Print live switchboard events until Ctrl+C
    Watch,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List stored tasks
    List,
    /// Store a new task
    Create {
        /// Task name
        #[arg(long)]
        name: String,
        /// Target server ID
        #[arg(long)]
        server: ServerId,
        /// Command the task runs
        #[arg(long)]
        command: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: u64,
    },
    /// Run a task now
    Run {
        /// Task ID
        id: u64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_ref();

    // Config commands work without a loadable config
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Show => commands::config_show(config_path)?,
            ConfigAction::Path => commands::config_path(config_path),
            ConfigAction::Init { force } => commands::config_init(config_path, *force)?,
        }
        return Ok(());
    }

    let config = commands::load_client_config(config_path)?;

    match cli.command {
        Commands::Servers => commands::servers_command(&config).await?,
        Commands::Add { fields } => commands::add_command(&config, fields).await?,
        Commands::Edit { id, fields } => commands::edit_command(&config, id, fields).await?,
        Commands::Remove { id } => commands::remove_command(&config, id).await?,
        Commands::Connect { id } => commands::connect_command(&config, id).await?,
        Commands::Disconnect { id } => commands::disconnect_command(&config, id).await?,
        Commands::Exec {
            id,
            command,
            export,
        } => commands::exec_command(&config, id, &command, export.as_ref()).await?,
        Commands::Batch(args) => commands::batch_command(&config, args).await?,
        Commands::History { filter, clear } => {
            commands::history_command(&config, filter.as_deref(), clear)?
        }
        Commands::Logs { id } => commands::logs_command(&config, id).await?,
        Commands::Metrics { id } => commands::metrics_command(&config, id).await?,
        Commands::Tasks { action } => match action {
            TaskAction::List => commands::tasks_list(&config).await?,
            TaskAction::Create {
                name,
                server,
                command,
            } => commands::task_create(&config, &name, server, &command).await?,
            TaskAction::Delete { id } => commands::task_delete(&config, id).await?,
            TaskAction::Run { id } => commands::task_run(&config, id).await?,
        },
        Commands::Watch => commands::watch_command(&config).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
