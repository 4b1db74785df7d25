// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cognitive Pipeline
//!
//! Request-triggered control flow for one event:
//!
//! ```text
//! agent mesh -> conflict detector -+-> consensus builder ---------+-> mesh linking -> memory evaluation
//!                                  +-> peer review -+-> resolved -+
//!                                                   +-> pending ----------------------> memory evaluation
//! ```
//!
//! Each stage runs to completion or fails the run; there is no mid-pipeline
//! abort. Error-flagged agent responses stay in the returned response list
//! but never reach detection or fusion.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::agent::{ActionPlan, AgentResponse};
use crate::domain::config::EngineConfig;
use crate::domain::consensus::{Consensus, ConflictReport};
use crate::domain::errors::CortexResult;
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{NodeId, Properties};
use crate::domain::memory::{EvaluationContext, MemoryRecord, NewEvent};
use crate::domain::repository::{GraphRepository, LinkTaxonomy, VectorSearch};
use crate::domain::review::ReviewStatus;
use crate::domain::vector::EmotionVector;

use super::agent_mesh::{AgentMesh, AgentRegistry};
use super::conflict_detector::ConflictDetector;
use super::consensus_builder::ConsensusBuilder;
use super::memory_lifecycle::{EvaluationResult, MemoryLifecycleManager};
use super::mesh_synthesizer::{MeshReport, MeshSynthesizer};
use super::peer_review::{PeerReviewEscalator, ReviewOutcome};
use super::value_schema::ValueSchemaRegistry;
use super::vector_scorer::VectorScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Agents agreed; consensus built directly
    Consensus,
    /// Agents diverged and the critique round converged
    ReviewResolved,
    /// Critique round did not converge. Normal, not a failure.
    PendingReview,
    /// No usable agent response
    NoResponses,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Consensus => f.write_str("consensus"),
            PipelineStatus::ReviewResolved => f.write_str("review_resolved"),
            PipelineStatus::PendingReview => f.write_str("pending_review"),
            PipelineStatus::NoResponses => f.write_str("no_responses"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub status: PipelineStatus,
    pub conflict: ConflictReport,
    pub consensus: Option<Consensus>,
    pub consensus_id: Option<NodeId>,
    pub review: Option<ReviewOutcome>,
}

impl PipelineOutcome {
    fn no_responses() -> Self {
        Self {
            status: PipelineStatus::NoResponses,
            conflict: ConflictReport::no_conflict(),
            consensus: None,
            consensus_id: None,
            review: None,
        }
    }

    /// The node this run produced: the consensus, or the open conflict
    pub fn node_id(&self) -> Option<NodeId> {
        self.consensus_id.or_else(|| {
            self.review
                .as_ref()
                .and_then(|r| r.conflict.as_ref())
                .map(|c| c.id)
        })
    }

    /// Action plan carried by the consensus, for an actuator to dispatch.
    /// Deferred plans are held back.
    pub fn action_plan(&self) -> Option<&ActionPlan> {
        self.consensus
            .as_ref()
            .and_then(|c| c.action_plan.as_ref())
            .filter(|plan| !plan.is_deferred())
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub event_id: NodeId,
    /// Every agent's response, failures included
    pub responses: Vec<AgentResponse>,
    pub pipeline: PipelineOutcome,
    pub evaluation: EvaluationResult,
    /// Absent without a consensus
    pub mesh: Option<MeshReport>,
}

/// Collaborators the pipeline is wired from
pub struct PipelineDeps {
    pub repository: Arc<dyn GraphRepository>,
    pub search: Arc<dyn VectorSearch>,
    pub taxonomy: Arc<dyn LinkTaxonomy>,
    pub event_bus: Arc<dyn EventBus>,
    pub agents: Arc<AgentRegistry>,
    pub scorer: Option<Arc<VectorScorer>>,
}

pub struct CognitivePipeline {
    registry: Arc<ValueSchemaRegistry>,
    mesh: AgentMesh,
    detector: ConflictDetector,
    builder: Arc<ConsensusBuilder>,
    escalator: PeerReviewEscalator,
    lifecycle: Arc<MemoryLifecycleManager>,
    synthesizer: MeshSynthesizer,
    scorer: Option<Arc<VectorScorer>>,
    repository: Arc<dyn GraphRepository>,
    event_bus: Arc<dyn EventBus>,
}

impl CognitivePipeline {
    pub fn new(config: &EngineConfig, deps: PipelineDeps) -> Self {
        let PipelineDeps {
            repository,
            search,
            taxonomy,
            event_bus,
            agents,
            scorer,
        } = deps;

        let registry = Arc::new(ValueSchemaRegistry::new(repository.clone(), event_bus.clone()));
        let builder = Arc::new(ConsensusBuilder::new(
            registry.clone(),
            repository.clone(),
            event_bus.clone(),
            config.consensus.clone(),
        ));
        let mut lifecycle =
            MemoryLifecycleManager::new(repository.clone(), event_bus.clone(), config.memory.clone());
        if let Some(scorer) = &scorer {
            lifecycle = lifecycle.with_scorer(scorer.clone());
        }

        Self {
            mesh: AgentMesh::new(agents.clone(), registry.clone(), repository.clone(), event_bus.clone()),
            detector: ConflictDetector::new(config.consensus.conflict_threshold),
            escalator: PeerReviewEscalator::new(
                agents,
                builder.clone(),
                repository.clone(),
                taxonomy.clone(),
                event_bus.clone(),
            ),
            synthesizer: MeshSynthesizer::new(
                search,
                taxonomy,
                repository.clone(),
                registry.clone(),
                event_bus.clone(),
                config.mesh.clone(),
            ),
            lifecycle: Arc::new(lifecycle),
            registry,
            builder,
            scorer,
            repository,
            event_bus,
        }
    }

    pub fn schema_registry(&self) -> &Arc<ValueSchemaRegistry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &Arc<MemoryLifecycleManager> {
        &self.lifecycle
    }

    pub fn agent_mesh(&self) -> &AgentMesh {
        &self.mesh
    }

    /// Create an Event node, scoring its text when a scorer is configured
    pub async fn ingest_event(
        &self,
        raw_text: &str,
        topics: Vec<String>,
        pinned: bool,
    ) -> CortexResult<MemoryRecord> {
        let mut record = self
            .lifecycle
            .ingest_event(NewEvent::new(raw_text).with_topics(topics).pinned(pinned))
            .await?;

        if let Some(scorer) = &self.scorer {
            let schema = self.registry.get_pool().await?;
            record.value_vector = scorer.value_vector_or_empty(raw_text, &schema).await;
            record.emotion_vector = scorer.emotion_vector_or_empty(raw_text).await;

            let mut properties = Properties::new();
            properties.insert("value_vector".into(), json!(record.value_vector));
            properties.insert("emotion_vector".into(), json!(record.emotion_vector));
            self.repository.update_node(record.id, properties).await?;
        }
        Ok(record)
    }

    /// Detect conflict among the responses, then build a consensus or
    /// escalate to peer review
    pub async fn consensus_pipeline(
        &self,
        event_id: NodeId,
        responses: &[AgentResponse],
    ) -> CortexResult<PipelineOutcome> {
        let usable: Vec<AgentResponse> = responses.iter().filter(|r| !r.is_error()).cloned().collect();
        if usable.is_empty() {
            warn!(event_id = %event_id, total = responses.len(), "No usable agent responses");
            return Ok(PipelineOutcome::no_responses());
        }

        let conflict = self.detector.detect(&usable);
        if !conflict.needs_review {
            let consensus = self.builder.build_consensus(Some(event_id), &usable).await?;
            let consensus_id = match &consensus {
                Some(consensus) => Some(self.builder.write_consensus(consensus).await?),
                None => None,
            };
            return Ok(PipelineOutcome {
                status: PipelineStatus::Consensus,
                conflict,
                consensus,
                consensus_id,
                review: None,
            });
        }

        self.event_bus.publish(CortexEvent::ConflictDetected {
            event_id,
            triggers: conflict.triggers.iter().map(|t| t.to_string()).collect(),
            conflict_axes: conflict.conflict_axes.clone(),
            timestamp: Utc::now(),
        });

        let review = self.escalator.review(event_id, &usable).await?;
        let status = match review.status() {
            ReviewStatus::Resolved => PipelineStatus::ReviewResolved,
            ReviewStatus::Unresolved => PipelineStatus::PendingReview,
        };
        Ok(PipelineOutcome {
            status,
            conflict,
            consensus: review.consensus.clone(),
            consensus_id: review.consensus_id,
            review: Some(review),
        })
    }

    /// Run one event through every stage
    pub async fn process_event(
        &self,
        event_id: NodeId,
        context: EvaluationContext,
    ) -> CortexResult<ProcessOutcome> {
        let responses = self.mesh.run_agent_mesh(event_id).await?;
        let pipeline = self.consensus_pipeline(event_id, &responses).await?;

        let usable: Vec<&AgentResponse> = responses.iter().filter(|r| !r.is_error()).collect();
        let mut context = context;
        if context.agent_priority.is_none() {
            context.agent_priority = usable.iter().map(|r| r.agent_priority).reduce(f64::max);
        }
        if let Some(consensus) = &pipeline.consensus {
            self.record_consensus(event_id, consensus, &usable).await?;
            context.alignment = Some(consensus.consensus_score);
            context.rationale = Some(consensus.rationale.clone());
        }

        // before evaluation, while no promoted copy of the event exists
        let mesh = match &pipeline.consensus {
            Some(consensus) => {
                if let Some(plan) = consensus.action_plan.as_ref().filter(|p| p.is_deferred()) {
                    info!(event_id = %event_id, action_type = %plan.action_type, "Deferred action plan held back");
                }
                let event = self.lifecycle.load(event_id).await?;
                Some(
                    self.synthesizer
                        .create_mesh_edges(event_id, &consensus.value_vector, &event)
                        .await?,
                )
            }
            None => None,
        };

        let evaluation = self.lifecycle.evaluate_event(event_id, &context).await?;

        info!(
            event_id = %event_id,
            status = %pipeline.status,
            score = evaluation.score,
            promoted = evaluation.promoted(),
            edges = mesh.as_ref().map(|m| m.edges_created()).unwrap_or(0),
            "Event processed"
        );
        Ok(ProcessOutcome {
            event_id,
            responses,
            pipeline,
            evaluation,
            mesh,
        })
    }

    /// Write the fused reading back onto the event before it is evaluated
    async fn record_consensus(
        &self,
        event_id: NodeId,
        consensus: &Consensus,
        responses: &[&AgentResponse],
    ) -> CortexResult<()> {
        let event = self.lifecycle.load(event_id).await?;
        let mut properties = Properties::new();
        properties.insert("value_vector".into(), json!(consensus.value_vector));
        properties.insert("agent_alignment".into(), json!(consensus.consensus_score));
        if event.emotion_vector.is_empty() {
            let mean = EmotionVector::mean(responses.iter().map(|r| &r.emotion_vector));
            properties.insert("emotion_vector".into(), json!(mean));
        }
        self.repository.update_node(event_id, properties).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent_mesh::{AgentContext, ReasoningAgent};
    use crate::domain::agent::{AgentDescriptor, CritiqueReply};
    use crate::domain::errors::CortexError;
    use crate::domain::graph::NodeLabel;
    use crate::domain::vector::{SchemaVersion, ValueVector};
    use crate::infrastructure::{BroadcastEventBus, InMemoryGraphRepository};
    use async_trait::async_trait;

    struct Fixed {
        descriptor: AgentDescriptor,
        rationale: String,
        score: f64,
        fail: bool,
        plan: Option<ActionPlan>,
    }

    #[async_trait]
    impl ReasoningAgent for Fixed {
        fn descriptor(&self) -> &AgentDescriptor {
            &self.descriptor
        }

        async fn produce(&self, _event: &MemoryRecord, context: &AgentContext) -> CortexResult<AgentResponse> {
            if self.fail {
                return Err(CortexError::InvalidInput("offline".into()));
            }
            let response = AgentResponse::new(
                self.descriptor.name.clone(),
                self.rationale.clone(),
                self.score,
                ValueVector::new(context.schema.version),
                EmotionVector::new(),
            );
            Ok(match &self.plan {
                Some(plan) => response.with_action_plan(plan.clone()),
                None => response,
            })
        }

        async fn review(
            &self,
            _event: &MemoryRecord,
            _own: &AgentResponse,
            _peers: &[AgentResponse],
        ) -> CortexResult<CritiqueReply> {
            Ok(CritiqueReply {
                revised_rationale: self.rationale.clone(),
                value_vector_diff: Default::default(),
                emotion_vector_diff: Default::default(),
                shifted: false,
            })
        }
    }

    fn pipeline(agents: Vec<Fixed>) -> (Arc<InMemoryGraphRepository>, CognitivePipeline) {
        let repo = Arc::new(InMemoryGraphRepository::with_default_taxonomy());
        let registry = Arc::new(AgentRegistry::new());
        for agent in agents {
            registry.register(Arc::new(agent));
        }
        let deps = PipelineDeps {
            repository: repo.clone(),
            search: repo.clone(),
            taxonomy: repo.clone(),
            event_bus: Arc::new(BroadcastEventBus::new(256)),
            agents: registry,
            scorer: None,
        };
        (repo, CognitivePipeline::new(&EngineConfig::default(), deps))
    }

    fn agent(name: &str, rationale: &str, score: f64) -> Fixed {
        Fixed {
            descriptor: AgentDescriptor::new(name, "reasoner").with_priority(0.5),
            rationale: rationale.into(),
            score,
            fail: false,
            plan: None,
        }
    }

    #[tokio::test]
    async fn test_agreeing_agents_reach_direct_consensus() {
        let (repo, pipeline) = pipeline(vec![agent("a", "same", 0.6), agent("b", "same", 0.7)]);
        let event = pipeline.ingest_event("harbour lights", vec![], false).await.unwrap();

        let outcome = pipeline
            .process_event(event.id, EvaluationContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.pipeline.status, PipelineStatus::Consensus);
        assert!(outcome.pipeline.node_id().is_some());
        assert!(outcome.mesh.is_some());

        let stored = pipeline.lifecycle().load(event.id).await.unwrap();
        assert!((stored.agent_alignment.unwrap() - 0.65).abs() < 1e-12);
        assert_eq!(stored.agent_priority, Some(0.5));
        assert_eq!(repo.edges_from(outcome.pipeline.consensus_id.unwrap()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_diverging_agents_go_to_review() {
        let (_repo, pipeline) = pipeline(vec![agent("a", "kind", 0.6), agent("b", "cruel", 0.6)]);
        let event = pipeline.ingest_event("an argument", vec![], false).await.unwrap();

        let outcome = pipeline
            .process_event(event.id, EvaluationContext::default())
            .await
            .unwrap();
        // both reviewers hold their position, so the round converges
        assert_eq!(outcome.pipeline.status, PipelineStatus::ReviewResolved);
        assert!(outcome.pipeline.conflict.needs_review);
        assert!(outcome.pipeline.review.is_some());
    }

    #[tokio::test]
    async fn test_failed_agents_are_kept_but_not_fused() {
        let mut broken = agent("broken", "", 0.0);
        broken.fail = true;
        let (_repo, pipeline) = pipeline(vec![agent("a", "fine", 0.8), broken]);
        let event = pipeline.ingest_event("quiet morning", vec![], false).await.unwrap();

        let outcome = pipeline
            .process_event(event.id, EvaluationContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.responses.len(), 2);
        assert!(outcome.responses[1].is_error());
        assert_eq!(outcome.pipeline.status, PipelineStatus::Consensus);
        assert_eq!(outcome.pipeline.consensus.unwrap().agent_names, vec!["a"]);
    }

    #[tokio::test]
    async fn test_schema_action_plans_are_not_dispatched() {
        let mut proposer = agent("a", "same", 0.6);
        proposer.plan = Some(ActionPlan {
            action_type: "schema".into(),
            details: serde_json::Value::Null,
        });
        let (_repo, held) = pipeline(vec![proposer, agent("b", "same", 0.6)]);
        let event = held.ingest_event("rename a value", vec![], false).await.unwrap();

        let outcome = held
            .process_event(event.id, EvaluationContext::default())
            .await
            .unwrap();
        let consensus = outcome.pipeline.consensus.as_ref().unwrap();
        assert_eq!(consensus.action_plan.as_ref().unwrap().action_type, "schema");
        assert!(outcome.pipeline.action_plan().is_none());

        let mut emailer = agent("c", "same", 0.6);
        emailer.plan = Some(ActionPlan {
            action_type: "email".into(),
            details: serde_json::Value::Null,
        });
        let (_repo, direct) = pipeline(vec![emailer]);
        let event = direct.ingest_event("thank a friend", vec![], false).await.unwrap();
        let outcome = direct
            .process_event(event.id, EvaluationContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.pipeline.action_plan().unwrap().action_type, "email");
    }

    #[tokio::test]
    async fn test_no_usable_responses() {
        let (_repo, pipeline) = pipeline(vec![]);
        let outcome = pipeline
            .consensus_pipeline(NodeId::new(), &[AgentResponse::failed("x", "down", SchemaVersion(0))])
            .await
            .unwrap();
        assert_eq!(outcome.status, PipelineStatus::NoResponses);
        assert!(outcome.node_id().is_none());
    }

    #[tokio::test]
    async fn test_missing_event_is_an_error() {
        let (repo, pipeline) = pipeline(vec![agent("a", "x", 0.5)]);
        let value = repo.create_node(NodeLabel::Value, Properties::new()).await.unwrap();
        assert!(pipeline
            .process_event(NodeId::new(), EvaluationContext::default())
            .await
            .is_err());
        assert!(pipeline
            .process_event(value.id, EvaluationContext::default())
            .await
            .is_err());
    }
}
