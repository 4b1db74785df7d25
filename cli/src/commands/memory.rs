// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Memory inspection and maintenance
//!
//! Commands: list, decay, resurface, restore, prune

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use ecodia_cortex::{MemoryKind, MemoryRecord};

use super::{load_config, parse_node_id};
use crate::engine::{Engine, Wiring};

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Event,
    Core,
}

impl From<KindArg> for MemoryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Event => MemoryKind::Event,
            KindArg::Core => MemoryKind::CoreMemory,
        }
    }
}

#[derive(Subcommand)]
pub enum MemoryCommand {
    /// List memories, newest first
    List {
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Include archived memories
        #[arg(long)]
        archived: bool,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Run one full maintenance cycle now
    Decay,

    /// Surface the most valuable core memories
    Resurface {
        /// Recorded in each memory's audit log
        #[arg(long, default_value = "manual")]
        trigger: String,
    },

    /// Archive a memory and everything downstream of it
    Prune {
        id: String,

        #[arg(long, default_value = "manual")]
        reason: String,
    },

    /// Restore an archived branch
    Restore { id: String },
}

pub async fn handle_command(
    command: MemoryCommand,
    config_path: Option<PathBuf>,
    store: PathBuf,
) -> Result<()> {
    let engine = Engine::open(load_config(config_path)?, store, Wiring::Offline).await?;
    let lifecycle = engine.pipeline.lifecycle();

    match command {
        MemoryCommand::List {
            kind,
            archived,
            limit,
        } => {
            let records = lifecycle
                .list(kind.map(MemoryKind::from), archived, Some(limit))
                .await
                .context("Failed to list memories")?;
            if records.is_empty() {
                println!("{}", "No memories found.".dimmed());
            }
            for record in &records {
                print_record(record);
            }
            return Ok(());
        }
        MemoryCommand::Decay => {
            let report = engine
                .maintenance_task()
                .run_cycle()
                .await
                .context("Maintenance cycle failed")?;
            println!(
                "{}",
                format!(
                    "✓ Decayed {}, archived {}, resurfaced {}",
                    report.decayed, report.archived, report.resurfaced
                )
                .green()
            );
        }
        MemoryCommand::Resurface { trigger } => {
            let surfaced = lifecycle
                .resurface_valuable_memories(Some(&trigger))
                .await
                .context("Failed to resurface memories")?;
            println!("{}", format!("✓ Resurfaced {} core memories", surfaced.len()).green());
            for id in surfaced {
                println!("  {}", id);
            }
        }
        MemoryCommand::Prune { id, reason } => {
            let id = parse_node_id(&id)?;
            let archived = lifecycle
                .prune_branch(id, &reason)
                .await
                .with_context(|| format!("Failed to prune {}", id))?;
            println!("{}", format!("✓ Archived {} nodes", archived.len()).green());
        }
        MemoryCommand::Restore { id } => {
            let id = parse_node_id(&id)?;
            let restored = lifecycle
                .restore_branch(id)
                .await
                .with_context(|| format!("Failed to restore {}", id))?;
            println!("{}", format!("✓ Restored {} nodes", restored.len()).green());
        }
    }

    engine.save().await
}

fn print_record(record: &MemoryRecord) {
    let kind = match record.kind {
        MemoryKind::Event => "event".normal(),
        MemoryKind::CoreMemory => "core".cyan(),
    };
    let score = record
        .relevance_score
        .map(|s| format!("{:.3}", s))
        .unwrap_or_else(|| "  -  ".to_string());
    let mut flags = Vec::new();
    if record.user_pinned {
        flags.push("pinned");
    }
    if record.promoted {
        flags.push("promoted");
    }
    if record.archived {
        flags.push("archived");
    }
    let text: String = record.raw_text.chars().take(60).collect();
    println!(
        "{}  {:<5} {}  {}  {}",
        record.id,
        kind,
        score,
        text,
        flags.join(",").dimmed()
    );
}
