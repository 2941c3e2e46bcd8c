//! # TaskFlow CLI (`taskflow`)
//!
//! The `taskflow` binary fetches activity from the configured external
//! services, prints insights and a daily digest, works with markdown notes
//! on disk, and starts the JSON HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! taskflow --config ./config/taskflow.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `taskflow sources` | List providers, identities, and credential status |
//! | `taskflow stats [--json]` | Fetch every configured provider and summarize |
//! | `taskflow insights` | Print insight sentences |
//! | `taskflow digest` | Print the daily digest |
//! | `taskflow render <file> [--json]` | Show the block structure of a markdown note |
//! | `taskflow toggle <file> --line <n>` | Flip a todo checkbox in a note |
//! | `taskflow serve` | Start the HTTP server |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `taskflow=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use taskflow::{config, notes, server, sources, stats};

/// TaskFlow CLI: a personal activity hub for coding practice, code, and
/// communication, plus markdown notes.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/taskflow.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "taskflow",
    about = "TaskFlow: aggregate LeetCode, Codeforces, GitHub, Reddit, and email activity",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/taskflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List providers and their configuration status.
    Sources,

    /// Fetch all configured providers and print a summary.
    Stats {
        /// Print the full aggregate as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print insight sentences derived from the latest fetch.
    Insights,

    /// Print today's digest: highlights and action items.
    Digest,

    /// Parse a markdown note and print its blocks.
    ///
    /// Does not need a config file.
    Render {
        file: PathBuf,

        /// Print blocks as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Toggle the todo checkbox on one line of a markdown note.
    ///
    /// Does not need a config file.
    Toggle {
        file: PathBuf,

        /// 1-based line number of the todo.
        #[arg(long)]
        line: usize,
    },

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Note commands work on files directly
    match &cli.command {
        Commands::Render { file, json } => return notes::run_render(file, *json),
        Commands::Toggle { file, line } => return notes::run_toggle(file, *line),
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json).await?;
        }
        Commands::Insights => {
            stats::run_insights(&cfg).await?;
        }
        Commands::Digest => {
            stats::run_digest(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Render { .. } | Commands::Toggle { .. } => {}
    }

    Ok(())
}
