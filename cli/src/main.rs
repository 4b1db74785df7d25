// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Ecodia CLI
//!
//! Operator entry point for the cortex engine.
//!
//! # Usage
//!
//! ```bash
//! # Ingest an event and run it through the agent mesh
//! ecodia event ingest "walked the dog at dawn" --topic routine
//!
//! # Inspect and shape the value schema
//! ecodia schema list
//! ecodia schema add empathy --importance 0.6
//!
//! # Run the maintenance cycle once, or on a schedule
//! ecodia memory decay
//! ecodia daemon
//!
//! # Configuration
//! ecodia config show
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod engine;

use commands::{ConfigCommand, DaemonArgs, EventCommand, MemoryCommand, SchemaCommand};

/// Ecodia - cognitive consensus and memory lifecycle engine
#[derive(Parser)]
#[command(name = "ecodia")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "ECODIA_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Path to the graph snapshot (default: ~/.ecodia/graph.json)
    #[arg(long, global = true, env = "ECODIA_STORE_PATH")]
    store: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ECODIA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Value schema administration
    #[command(subcommand)]
    Schema(SchemaCommand),

    /// Ingest and process events
    #[command(subcommand)]
    Event(EventCommand),

    /// Memory inspection and maintenance
    #[command(subcommand)]
    Memory(MemoryCommand),

    /// Run the maintenance cycle on a schedule until interrupted
    Daemon(DaemonArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let store = cli.store.unwrap_or_else(engine::default_store_path);

    match cli.command {
        Some(Commands::Config(cmd)) => commands::config::handle_command(cmd, cli.config).await,
        Some(Commands::Schema(cmd)) => {
            commands::schema::handle_command(cmd, cli.config, store).await
        }
        Some(Commands::Event(cmd)) => commands::event::handle_command(cmd, cli.config, store).await,
        Some(Commands::Memory(cmd)) => {
            commands::memory::handle_command(cmd, cli.config, store).await
        }
        Some(Commands::Daemon(args)) => commands::daemon::run(args, cli.config, store).await,
        None => {
            println!("{}", "No command specified. Use --help for usage.".yellow());
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
