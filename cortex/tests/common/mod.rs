// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use ecodia_cortex::application::{AgentContext, AgentRegistry, CognitivePipeline, PipelineDeps, ReasoningAgent};
use ecodia_cortex::{
    AgentDescriptor, AgentResponse, BroadcastEventBus, CortexError, CortexResult, CritiqueReply,
    EmotionVector, EngineConfig, InMemoryGraphRepository, MemoryRecord, ValueVector,
};

/// Agent with a fixed reading of every event and a fixed critique vote
pub struct ScriptedAgent {
    pub descriptor: AgentDescriptor,
    pub rationale: String,
    pub score: f64,
    pub values: BTreeMap<String, f64>,
    /// `None` makes `review` fail
    pub shifted: Option<bool>,
    pub fail_produce: bool,
}

impl ScriptedAgent {
    pub fn new(name: &str, rationale: &str, score: f64) -> Self {
        Self {
            descriptor: AgentDescriptor::new(name, "reasoner"),
            rationale: rationale.to_string(),
            score,
            values: BTreeMap::new(),
            shifted: Some(false),
            fail_produce: false,
        }
    }

    pub fn with_value(mut self, axis: &str, score: f64) -> Self {
        self.values.insert(axis.to_string(), score);
        self
    }

    pub fn shifting(mut self, shifted: bool) -> Self {
        self.shifted = Some(shifted);
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.descriptor = self.descriptor.with_priority(priority);
        self
    }
}

#[async_trait]
impl ReasoningAgent for ScriptedAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn produce(&self, _event: &MemoryRecord, context: &AgentContext) -> CortexResult<AgentResponse> {
        if self.fail_produce {
            return Err(CortexError::InvalidInput(format!("{} is offline", self.descriptor.name)));
        }
        let vector = ValueVector::with_scores(
            context.schema.version,
            self.values.iter().map(|(k, v)| (k.clone(), *v)),
        );
        Ok(AgentResponse::new(
            self.descriptor.name.clone(),
            self.rationale.clone(),
            self.score,
            vector,
            EmotionVector::new(),
        ))
    }

    async fn review(
        &self,
        _event: &MemoryRecord,
        _own: &AgentResponse,
        _peers: &[AgentResponse],
    ) -> CortexResult<CritiqueReply> {
        let shifted = self
            .shifted
            .ok_or_else(|| CortexError::InvalidInput("no critique".into()))?;
        Ok(CritiqueReply {
            revised_rationale: self.rationale.clone(),
            value_vector_diff: BTreeMap::new(),
            emotion_vector_diff: BTreeMap::new(),
            shifted,
        })
    }
}

pub struct Engine {
    pub repo: Arc<InMemoryGraphRepository>,
    pub bus: Arc<BroadcastEventBus>,
    pub agents: Arc<AgentRegistry>,
    pub pipeline: CognitivePipeline,
}

pub fn engine(agents: Vec<ScriptedAgent>) -> Engine {
    engine_with_config(agents, EngineConfig::default())
}

pub fn engine_with_config(agents: Vec<ScriptedAgent>, config: EngineConfig) -> Engine {
    let repo = Arc::new(InMemoryGraphRepository::with_default_taxonomy());
    let bus = Arc::new(BroadcastEventBus::new(1024));
    let registry = Arc::new(AgentRegistry::new());
    for agent in agents {
        registry.register(Arc::new(agent));
    }
    let pipeline = CognitivePipeline::new(
        &config,
        PipelineDeps {
            repository: repo.clone(),
            search: repo.clone(),
            taxonomy: repo.clone(),
            event_bus: bus.clone(),
            agents: registry.clone(),
            scorer: None,
        },
    );
    Engine {
        repo,
        bus,
        agents: registry,
        pipeline,
    }
}
