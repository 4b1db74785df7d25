// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use ecodia_cortex::EngineConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./ecodia-config.yaml")]
        output: PathBuf,

        /// Include a provider and two agents
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = EngineConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. ECODIA_CONFIG_PATH: {}",
            std::env::var("ECODIA_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./ecodia-config.yaml");
        println!("  4. ~/.ecodia/config.yaml");
        println!("  5. /etc/ecodia/config.yaml");
        println!();
    }

    println!("{}", "Consensus:".bold());
    println!("  Conflict threshold: {}", config.consensus.conflict_threshold);
    println!(
        "  Importance bump: +{} above {} (cap {})",
        config.consensus.importance_bump_amount,
        config.consensus.importance_bump_threshold,
        config.consensus.importance_cap
    );
    println!();

    println!("{}", "Memory:".bold());
    println!(
        "  Promotion threshold: {} - {} x priority",
        config.memory.promotion_base, config.memory.priority_discount
    );
    println!("  Base decay rate: {}", config.memory.base_decay_rate);
    println!("  Prune threshold: {}", config.memory.prune_threshold);
    println!(
        "  Resurfacing: score >= {}, up to {}",
        config.memory.min_surface_score, config.memory.resurface_limit
    );
    println!();

    println!("{}", "Maintenance:".bold());
    let state = if config.maintenance.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("  {} every {}s", state, config.maintenance.interval_seconds);
    println!();

    println!("{}", "LLM Providers:".bold());
    if config.llm.providers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for provider in &config.llm.providers {
        println!("  {} ({})", provider.name.bold(), provider.provider_type);
        println!("    Endpoint: {}", provider.endpoint);
        for model in &provider.models {
            println!("      - {} → {}", model.alias, model.model);
        }
    }
    println!("  Scoring model: {}", config.llm.scoring_model);
    println!();

    println!("{}", "Agents:".bold());
    if config.agents.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for agent in &config.agents {
        println!(
            "  {} [{}] model={} priority={}",
            agent.name.bold(),
            agent.role,
            agent.model,
            agent.priority
        );
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = EngineConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_templates_parse_and_validate() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = ecodia_cortex::EngineConfig::from_yaml_str(template).unwrap();
            config.validate().unwrap();
        }
    }
}
