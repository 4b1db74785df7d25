// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Maintenance daemon
//!
//! Runs the maintenance task on its interval and writes the graph back after
//! every completed cycle. Ctrl-C stops the task and saves once more.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use ecodia_cortex::{CortexEvent, EventBusError};

use super::load_config;
use crate::engine::{Engine, Wiring};

#[derive(Args)]
pub struct DaemonArgs {
    /// Override the configured interval
    #[arg(long)]
    interval: Option<u64>,
}

pub async fn run(args: DaemonArgs, config_path: Option<PathBuf>, store: PathBuf) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(interval) = args.interval {
        config.maintenance.interval_seconds = interval.max(1);
    }
    if !config.maintenance.enabled {
        println!("{}", "Maintenance is disabled in the configuration.".yellow());
        return Ok(());
    }

    let engine = Engine::open(config, store, Wiring::Offline).await?;
    let task = Arc::new(engine.maintenance_task());
    let shutdown = task.shutdown_token();
    let mut events = engine.event_bus.subscribe();
    let handle = task.start();

    println!(
        "{}",
        format!(
            "Maintenance daemon running every {}s (Ctrl-C to stop)",
            engine.config.maintenance.interval_seconds
        )
        .green()
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(CortexEvent::MaintenanceCycleCompleted { .. }) => {
                    if let Err(e) = engine.save().await {
                        warn!("Failed to save graph after cycle: {:#}", e);
                    }
                }
                Ok(_) | Err(EventBusError::Lagged(_)) => {}
                Err(e) => {
                    warn!("Event stream closed: {}", e);
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                info!("Shutdown requested");
                break;
            }
        }
    }

    shutdown.cancel();
    handle.await.context("Maintenance task panicked")?;
    engine.save().await?;
    println!("{}", "✓ Daemon stopped".green());
    Ok(())
}
