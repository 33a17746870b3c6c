mod advisor;
mod commands;
mod config;
mod domain;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hostaudit", version, about = "Single-host audit: resource usage, SSH posture, and log intelligence")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full system audit
    Audit {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,

        /// Include a process snapshot in the report
        #[arg(long)]
        full: bool,
    },

    /// Security-focused audit: SSH posture and authentication anomalies
    Security {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Analyze authentication and system logs
    Logs {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Manage saved baselines
    Baseline {
        #[command(subcommand)]
        command: BaselineCommands,
    },
}

#[derive(Subcommand)]
enum BaselineCommands {
    /// Save the current system state as a baseline
    Save {
        /// Baseline name (defaults to a timestamp-derived name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List saved baselines in creation order
    List,

    /// Compare the current state against a baseline (latest when omitted)
    Compare {
        /// Baseline name
        name: Option<String>,

        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Delete a baseline
    Delete {
        /// Baseline name
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Audit { format, full } => commands::audit::run(&format, full),
        Commands::Security { format } => commands::security::run(&format),
        Commands::Logs { format } => commands::logs::run(&format),
        Commands::Baseline { command } => match command {
            BaselineCommands::Save { name } => commands::baseline::save(name.as_deref()),
            BaselineCommands::List => commands::baseline::list(),
            BaselineCommands::Compare { name, format } => {
                commands::baseline::compare(name.as_deref(), &format)
            }
            BaselineCommands::Delete { name } => commands::baseline::delete(&name),
        },
    }
}
