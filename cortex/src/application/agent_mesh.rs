// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent mesh
//!
//! Every reasoning agent is one capability, [`ReasoningAgent`], with two
//! operations: `produce` a first reading of an event and `review` peers'
//! readings during a critique round. Concrete agents are configurations of
//! that capability held in an explicit [`AgentRegistry`].
//!
//! [`AgentMesh::run_agent_mesh`] asks every active agent in parallel. One agent
//! failing never aborts the others; its slot is filled with an error-flagged
//! response.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::agent::{AgentDescriptor, AgentResponse, AgentStatus, CritiqueReply};
use crate::domain::errors::{CortexError, CortexResult};
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{to_properties, NodeFilter, NodeId, NodeLabel};
use crate::domain::memory::MemoryRecord;
use crate::domain::repository::GraphRepository;
use crate::domain::value::ValueSchema;

use super::value_schema::ValueSchemaRegistry;

/// What an agent sees besides the event itself
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub schema: ValueSchema,
}

#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    fn descriptor(&self) -> &AgentDescriptor;

    async fn produce(&self, event: &MemoryRecord, context: &AgentContext) -> CortexResult<AgentResponse>;

    /// Re-evaluate `own` in light of every other agent's full response
    async fn review(
        &self,
        event: &MemoryRecord,
        own: &AgentResponse,
        peers: &[AgentResponse],
    ) -> CortexResult<CritiqueReply>;
}

/// Registered reasoning agents, constructed once per process and shared by
/// reference
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<Vec<Arc<dyn ReasoningAgent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, replacing any agent with the same name
    pub fn register(&self, agent: Arc<dyn ReasoningAgent>) {
        let name = agent.descriptor().name.clone();
        let mut agents = self.agents.write();
        match agents.iter().position(|a| a.descriptor().name == name) {
            Some(index) => {
                debug!(agent = %name, "Replacing registered agent");
                agents[index] = agent;
            }
            None => {
                debug!(agent = %name, "Registering agent");
                agents.push(agent);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ReasoningAgent>> {
        self.agents
            .read()
            .iter()
            .find(|a| a.descriptor().name == name)
            .cloned()
    }

    /// Descriptors in registration order, optionally limited to one role
    pub fn roster(&self, role: Option<&str>) -> Vec<AgentDescriptor> {
        self.agents
            .read()
            .iter()
            .map(|a| a.descriptor().clone())
            .filter(|d| role.map_or(true, |r| d.role == r))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents
            .read()
            .iter()
            .map(|a| a.descriptor().name.clone())
            .collect()
    }

    pub fn active(&self) -> Vec<Arc<dyn ReasoningAgent>> {
        self.agents
            .read()
            .iter()
            .filter(|a| a.descriptor().status == AgentStatus::Active)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}

/// Find the `Agent` node for `name`, creating it when missing
pub async fn ensure_agent_node(
    repository: &dyn GraphRepository,
    name: &str,
    descriptor: Option<&AgentDescriptor>,
) -> CortexResult<NodeId> {
    let existing = repository
        .query_nodes(
            &NodeFilter::label(NodeLabel::Agent)
                .with_property("name", name)
                .including_archived(),
            None,
            Some(1),
        )
        .await?;
    if let Some(node) = existing.first() {
        return Ok(node.id);
    }

    let mut properties = match descriptor {
        Some(descriptor) => to_properties(descriptor)?,
        None => to_properties(&AgentDescriptor::new(name, "unknown"))?,
    };
    properties.insert("created_at".into(), json!(Utc::now()));
    let node = repository.create_node(NodeLabel::Agent, properties).await?;
    debug!(agent = name, node = %node.id, "Agent node created");
    Ok(node.id)
}

pub struct AgentMesh {
    agents: Arc<AgentRegistry>,
    schema_registry: Arc<ValueSchemaRegistry>,
    repository: Arc<dyn GraphRepository>,
    event_bus: Arc<dyn EventBus>,
}

impl AgentMesh {
    pub fn new(
        agents: Arc<AgentRegistry>,
        schema_registry: Arc<ValueSchemaRegistry>,
        repository: Arc<dyn GraphRepository>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            agents,
            schema_registry,
            repository,
            event_bus,
        }
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    /// Materialise every registered agent as an `Agent` node
    pub async fn sync_agent_nodes(&self) -> CortexResult<usize> {
        let roster = self.agents.roster(None);
        for descriptor in &roster {
            ensure_agent_node(self.repository.as_ref(), &descriptor.name, Some(descriptor)).await?;
        }
        Ok(roster.len())
    }

    /// One response per active agent, in registration order
    pub async fn run_agent_mesh(&self, event_id: NodeId) -> CortexResult<Vec<AgentResponse>> {
        let node = self
            .repository
            .find_node(event_id)
            .await?
            .ok_or(CortexError::NodeNotFound(event_id))?;
        let event = MemoryRecord::from_node(&node)?;
        let schema = self.schema_registry.get_pool().await?;
        let version = schema.version;
        let context = Arc::new(AgentContext { schema });
        let event = Arc::new(event);

        let agents = self.agents.active();
        info!(event_id = %event_id, agents = agents.len(), "Running agent mesh");

        let mut handles = Vec::with_capacity(agents.len());
        for agent in agents {
            let event = event.clone();
            let context = context.clone();
            let name = agent.descriptor().name.clone();
            let handle = tokio::spawn(async move { agent.produce(&event, &context).await });
            handles.push((name, handle));
        }

        let mut responses = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(format!("agent task panicked or was cancelled: {}", e)),
            };

            match outcome {
                Ok(response) => responses.push(self.stamp(response, &name, &event)),
                Err(error) => {
                    warn!(agent = %name, event_id = %event_id, error = %error, "Agent failed");
                    self.event_bus.publish(CortexEvent::AgentFailed {
                        agent_name: name.clone(),
                        event_id,
                        error: error.clone(),
                        timestamp: Utc::now(),
                    });
                    let mut failed = AgentResponse::failed(name, error, version);
                    failed.causal_trace = Self::trace_for(&event);
                    responses.push(failed);
                }
            }
        }

        Ok(responses)
    }

    /// Attach provenance the mesh owns: causal trace, priority, pin state
    fn stamp(&self, mut response: AgentResponse, name: &str, event: &MemoryRecord) -> AgentResponse {
        response.agent_name = name.to_string();
        if response.causal_trace.is_empty() {
            response.causal_trace = Self::trace_for(event);
        }
        if let Some(agent) = self.agents.get(name) {
            response.agent_priority = agent.descriptor().priority;
        }
        response.user_pinned = event.user_pinned;
        response.audit_log.append(
            "produced",
            json!({ "event_id": event.id, "score": response.score }),
        );
        response
    }

    fn trace_for(event: &MemoryRecord) -> Vec<NodeId> {
        let mut trace = event.causal_trace.clone();
        trace.push(event.id);
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vector::{EmotionVector, ValueVector};
    use crate::infrastructure::{BroadcastEventBus, InMemoryGraphRepository};

    struct StubAgent {
        descriptor: AgentDescriptor,
        score: Option<f64>,
    }

    impl StubAgent {
        fn new(name: &str, score: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                descriptor: AgentDescriptor::new(name, "reasoner").with_priority(0.4),
                score,
            })
        }
    }

    #[async_trait]
    impl ReasoningAgent for StubAgent {
        fn descriptor(&self) -> &AgentDescriptor {
            &self.descriptor
        }

        async fn produce(&self, event: &MemoryRecord, context: &AgentContext) -> CortexResult<AgentResponse> {
            let score = self
                .score
                .ok_or_else(|| CortexError::InvalidInput("stub refuses".into()))?;
            Ok(AgentResponse::new(
                self.descriptor.name.clone(),
                event.raw_text.clone(),
                score,
                ValueVector::new(context.schema.version),
                EmotionVector::new(),
            ))
        }

        async fn review(
            &self,
            _event: &MemoryRecord,
            _own: &AgentResponse,
            _peers: &[AgentResponse],
        ) -> CortexResult<CritiqueReply> {
            Ok(CritiqueReply {
                revised_rationale: String::new(),
                value_vector_diff: Default::default(),
                emotion_vector_diff: Default::default(),
                shifted: false,
            })
        }
    }

    #[test]
    fn test_registry_replaces_by_name_and_filters_by_role() {
        let registry = AgentRegistry::new();
        registry.register(StubAgent::new("alpha", Some(0.5)));
        registry.register(StubAgent::new("beta", Some(0.5)));
        registry.register(StubAgent::new("alpha", Some(0.9)));

        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert_eq!(registry.roster(Some("reasoner")).len(), 2);
        assert!(registry.roster(Some("critic")).is_empty());
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = AgentRegistry::new();
        let second = AgentRegistry::new();
        first.register(StubAgent::new("alpha", Some(0.5)));
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_one_failing_agent_does_not_abort_the_mesh() {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let bus = Arc::new(BroadcastEventBus::new(16));
        let mut receiver = bus.subscribe();
        let schema_registry = Arc::new(ValueSchemaRegistry::new(repo.clone(), bus.clone()));

        let agents = Arc::new(AgentRegistry::new());
        agents.register(StubAgent::new("alpha", Some(0.7)));
        agents.register(StubAgent::new("broken", None));
        agents.register(StubAgent::new("gamma", Some(0.3)));

        let record = MemoryRecord {
            raw_text: "the river flooded".into(),
            ..MemoryRecord::default()
        };
        let event = repo
            .create_node(NodeLabel::Event, to_properties(&record).unwrap())
            .await
            .unwrap();

        let mesh = AgentMesh::new(agents, schema_registry, repo, bus);
        let responses = mesh.run_agent_mesh(event.id).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert!(!responses[0].is_error());
        assert_eq!(responses[0].rationale, "the river flooded");
        assert_eq!(responses[0].causal_trace, vec![event.id]);
        assert_eq!(responses[0].agent_priority, 0.4);
        assert!(responses[1].is_error());
        assert_eq!(responses[1].agent_name, "broken");
        assert!(!responses[2].is_error());

        let events = receiver.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, CortexEvent::AgentFailed { agent_name, .. } if agent_name == "broken")));
    }

    #[tokio::test]
    async fn test_missing_event() {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let bus = Arc::new(BroadcastEventBus::new(16));
        let mesh = AgentMesh::new(
            Arc::new(AgentRegistry::new()),
            Arc::new(ValueSchemaRegistry::new(repo.clone(), bus.clone())),
            repo,
            bus,
        );
        assert!(matches!(
            mesh.run_agent_mesh(NodeId::new()).await,
            Err(CortexError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_agent_nodes_are_created_once() {
        let repo = InMemoryGraphRepository::new();
        let first = ensure_agent_node(&repo, "alpha", None).await.unwrap();
        let second = ensure_agent_node(&repo, "alpha", None).await.unwrap();
        assert_eq!(first, second);

        let nodes = repo
            .query_nodes(&NodeFilter::label(NodeLabel::Agent), None, None)
            .await
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].get_str("name"), Some("alpha"));
    }
}
