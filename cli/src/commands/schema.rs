// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Value schema administration
//!
//! Commands: list, add, remove, edit, importance, reset, audit

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use ecodia_cortex::{AxisEdit, ValueAxis};

use super::load_config;
use crate::engine::{Engine, Wiring};

#[derive(Subcommand)]
pub enum SchemaCommand {
    /// List the value axes of the current schema
    List {
        /// Include deactivated axes
        #[arg(long)]
        all: bool,
    },

    /// Add a value axis
    Add {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Display label (default: the name)
        #[arg(long)]
        label: Option<String>,

        #[arg(short, long, default_value = "0.5")]
        importance: f64,

        /// Recorded as the author of the change
        #[arg(long, default_value = "operator")]
        actor: String,
    },

    /// Remove a value axis
    Remove {
        name: String,

        #[arg(long, default_value = "operator")]
        actor: String,
    },

    /// Rename or relabel a value axis
    Edit {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        label: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long, default_value = "operator")]
        actor: String,
    },

    /// Set the importance of a value axis
    Importance {
        name: String,
        importance: f64,

        #[arg(long, default_value = "operator")]
        actor: String,
    },

    /// Deactivate every axis
    Reset {
        #[arg(long, default_value = "operator")]
        actor: String,

        #[arg(long, default_value = "manual reset")]
        note: String,
    },

    /// Show recent schema changes
    Audit {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

pub async fn handle_command(
    command: SchemaCommand,
    config_path: Option<PathBuf>,
    store: PathBuf,
) -> Result<()> {
    let engine = Engine::open(load_config(config_path)?, store, Wiring::Offline).await?;
    let registry = engine.pipeline.schema_registry();

    match command {
        SchemaCommand::List { all } => {
            let schema = registry.get_pool().await.context("Failed to read value schema")?;
            println!("{} {}", "Value schema".bold(), schema.version);
            let mut shown = 0;
            for axis in schema.axes.iter().filter(|axis| all || axis.active) {
                let name = if axis.active {
                    axis.name.bold()
                } else {
                    axis.name.dimmed()
                };
                println!("  {:<20} {:.3}  {}", name, axis.importance, axis.description);
                shown += 1;
            }
            if shown == 0 {
                println!("  {}", "(no axes)".dimmed());
            }
            return Ok(());
        }
        SchemaCommand::Audit { limit } => {
            let records = registry.audit_log(limit).await.context("Failed to read schema audit log")?;
            for record in records {
                println!(
                    "{:>4}  {}  {:<12} {:<10} {}",
                    record.sequence,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.action.to_string().bold(),
                    record.actor,
                    record.note
                );
            }
            return Ok(());
        }
        SchemaCommand::Add {
            name,
            description,
            label,
            importance,
            actor,
        } => {
            let mut axis = ValueAxis::new(name, description, importance, actor.clone());
            if let Some(label) = label {
                axis = axis.with_label(label);
            }
            let axis = registry.add_axis(&actor, axis).await.context("Failed to add axis")?;
            println!("{}", format!("✓ Added axis '{}'", axis.name).green());
        }
        SchemaCommand::Remove { name, actor } => {
            registry
                .remove_axis(&actor, &name)
                .await
                .context("Failed to remove axis")?;
            println!("{}", format!("✓ Removed axis '{}'", name).green());
        }
        SchemaCommand::Edit {
            name,
            rename,
            label,
            description,
            actor,
        } => {
            let edit = AxisEdit {
                name: rename,
                label,
                description,
            };
            if edit.is_empty() {
                println!("{}", "Nothing to change.".yellow());
                return Ok(());
            }
            let axis = registry
                .edit_axis(&actor, &name, edit)
                .await
                .context("Failed to edit axis")?;
            println!("{}", format!("✓ Updated axis '{}'", axis.name).green());
        }
        SchemaCommand::Importance {
            name,
            importance,
            actor,
        } => {
            let applied = registry
                .set_importance(&actor, &name, importance)
                .await
                .context("Failed to set importance")?;
            println!("{}", format!("✓ '{}' importance is now {:.3}", name, applied).green());
        }
        SchemaCommand::Reset { actor, note } => {
            let version = registry
                .reset_to_blank_slate(&actor, &note)
                .await
                .context("Failed to reset value schema")?;
            println!("{}", format!("✓ Value schema reset ({})", version).green());
        }
    }

    engine.save().await
}
