// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the ecodia CLI

pub mod config;
pub mod daemon;
pub mod event;
pub mod memory;
pub mod schema;

pub use self::config::ConfigCommand;
pub use self::daemon::DaemonArgs;
pub use self::event::EventCommand;
pub use self::memory::MemoryCommand;
pub use self::schema::SchemaCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;

use ecodia_cortex::{EngineConfig, NodeId};

pub(crate) fn load_config(config_path: Option<PathBuf>) -> Result<EngineConfig> {
    let config = EngineConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

pub(crate) fn parse_node_id(raw: &str) -> Result<NodeId> {
    raw.parse()
        .with_context(|| format!("'{}' is not a node id", raw))
}
