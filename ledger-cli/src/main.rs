//! Ledger CLI - accounts and transfers from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{accounts, logs, seed, serve, status, transfer, transfers};

/// Ledger - accounts and atomic fund transfers
#[derive(Parser)]
#[command(name = "ledger", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides settings.json and LEDGER_BIND)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show ledger summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        command: accounts::AccountsCommands,
    },

    /// Move funds between two accounts
    Transfer {
        /// Source account id
        #[arg(long)]
        from: i64,
        /// Destination account id
        #[arg(long)]
        to: i64,
        /// Amount, at most two decimal places
        #[arg(long)]
        amount: String,
        /// Replaying a key for the same source returns the original transfer
        #[arg(long)]
        idempotency_key: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect transfer records
    Transfers {
        #[command(subcommand)]
        command: transfers::TransfersCommands,
    },

    /// Create the demo accounts (requires allowSeed)
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { bind } => serve::run(bind),
        Commands::Status { json } => status::run(json),
        Commands::Accounts { command } => accounts::run(command),
        Commands::Transfer { from, to, amount, idempotency_key, json } => {
            transfer::run(from, to, &amount, idempotency_key, json)
        }
        Commands::Transfers { command } => transfers::run(command),
        Commands::Seed { json } => seed::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
