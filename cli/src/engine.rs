// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Engine bootstrap shared by the commands
//!
//! The graph lives in a JSON snapshot between invocations. Every command
//! opens it, does its work against the in-memory store and writes it back.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use ecodia_cortex::application::{
    AgentRegistry, CognitivePipeline, LlmAgent, MaintenanceTask, PipelineDeps, VectorScorer,
};
use ecodia_cortex::{
    BroadcastEventBus, EngineConfig, GatewayRegistry, InMemoryGraphRepository, LanguageModelGateway,
};

/// Snapshot used when `--store` is not given
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ecodia").join("graph.json"))
        .unwrap_or_else(|| PathBuf::from("./ecodia-graph.json"))
}

/// Whether the language-model stack should be wired in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiring {
    /// Store, bus and value schema only
    Offline,
    /// Configured agents and the vector scorer as well
    WithAgents,
}

pub struct Engine {
    pub config: EngineConfig,
    pub store: PathBuf,
    pub repository: Arc<InMemoryGraphRepository>,
    pub event_bus: Arc<BroadcastEventBus>,
    pub agents: Arc<AgentRegistry>,
    pub pipeline: CognitivePipeline,
}

impl Engine {
    pub async fn open(config: EngineConfig, store: PathBuf, wiring: Wiring) -> Result<Self> {
        let repository = Arc::new(open_store(&store).await?);
        let event_bus = Arc::new(BroadcastEventBus::with_default_capacity());
        let agents = Arc::new(AgentRegistry::new());

        let scorer = match wiring {
            Wiring::Offline => None,
            Wiring::WithAgents => {
                let gateway: Arc<dyn LanguageModelGateway> = Arc::new(
                    GatewayRegistry::from_config(&config.llm)
                        .context("Failed to initialize language model gateway")?,
                );
                for agent_config in &config.agents {
                    agents.register(Arc::new(LlmAgent::from_config(agent_config, gateway.clone())));
                }
                if agents.is_empty() {
                    warn!("No agents configured - events will be evaluated without a consensus");
                }
                info!(agents = agents.len(), "Agent mesh ready");
                Some(Arc::new(VectorScorer::new(gateway, config.llm.scoring_model.clone())))
            }
        };

        let pipeline = CognitivePipeline::new(
            &config,
            PipelineDeps {
                repository: repository.clone(),
                search: repository.clone(),
                taxonomy: repository.clone(),
                event_bus: event_bus.clone(),
                agents: agents.clone(),
                scorer,
            },
        );

        Ok(Self {
            config,
            store,
            repository,
            event_bus,
            agents,
            pipeline,
        })
    }

    pub fn maintenance_task(&self) -> MaintenanceTask {
        MaintenanceTask::new(
            self.pipeline.lifecycle().clone(),
            self.pipeline.schema_registry().clone(),
            self.event_bus.clone(),
            self.config.maintenance.clone(),
            self.config.schema.clone(),
        )
    }

    /// Write the graph back to the snapshot
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.store.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        self.repository
            .save_snapshot(&self.store)
            .await
            .with_context(|| format!("Failed to save graph to {:?}", self.store))?;
        info!(path = %self.store.display(), "Graph saved");
        Ok(())
    }
}

async fn open_store(path: &Path) -> Result<InMemoryGraphRepository> {
    if !path.exists() {
        info!(path = %path.display(), "No graph snapshot found, starting empty");
        return Ok(InMemoryGraphRepository::with_default_taxonomy());
    }
    InMemoryGraphRepository::load_snapshot(path)
        .await
        .with_context(|| format!("Failed to load graph from {:?}", path))
}
