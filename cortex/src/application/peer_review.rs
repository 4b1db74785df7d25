// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Peer Review Escalator
//!
//! One critique round per divergent event. Each agent sees its own response
//! and every other agent's response in full, then reports whether its
//! position shifted. Only a round where no agent shifted converges: a single
//! `shifted = true` (or an agent that could not answer) vetoes resolution.
//!
//! - converged: a consensus is built from the original responses and a
//!   resolved `PeerReview` is written
//! - otherwise: an unresolved `PeerReview` and an open `ConflictEvent` are
//!   written, linked by contradiction edges chosen from the live taxonomy to
//!   the event and to every dissenting agent
//!
//! There is no second round. An open conflict waits for external resolution.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::agent::AgentResponse;
use crate::domain::consensus::Consensus;
use crate::domain::errors::{CortexError, CortexResult};
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{links, select_link_type, to_properties, LinkClass, NodeId, NodeLabel, Properties};
use crate::domain::memory::MemoryRecord;
use crate::domain::repository::{GraphRepository, LinkTaxonomy};
use crate::domain::review::{ConflictEvent, ConflictStatus, Critique, PeerReview, ReviewStatus};

use super::agent_mesh::{ensure_agent_node, AgentRegistry};
use super::consensus_builder::ConsensusBuilder;

/// What a critique round produced
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub peer_review: PeerReview,
    /// Present when the round converged
    pub consensus: Option<Consensus>,
    pub consensus_id: Option<NodeId>,
    /// Present when the round did not converge
    pub conflict: Option<ConflictEvent>,
}

impl ReviewOutcome {
    pub fn status(&self) -> ReviewStatus {
        self.peer_review.status
    }
}

pub struct PeerReviewEscalator {
    agents: Arc<AgentRegistry>,
    builder: Arc<ConsensusBuilder>,
    repository: Arc<dyn GraphRepository>,
    taxonomy: Arc<dyn LinkTaxonomy>,
    event_bus: Arc<dyn EventBus>,
}

impl PeerReviewEscalator {
    pub fn new(
        agents: Arc<AgentRegistry>,
        builder: Arc<ConsensusBuilder>,
        repository: Arc<dyn GraphRepository>,
        taxonomy: Arc<dyn LinkTaxonomy>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            agents,
            builder,
            repository,
            taxonomy,
            event_bus,
        }
    }

    pub async fn review(&self, event_id: NodeId, responses: &[AgentResponse]) -> CortexResult<ReviewOutcome> {
        if responses.is_empty() {
            return Err(CortexError::InvalidInput("peer review needs at least one response".into()));
        }
        let node = self
            .repository
            .find_node(event_id)
            .await?
            .ok_or(CortexError::NodeNotFound(event_id))?;
        let event = Arc::new(MemoryRecord::from_node(&node)?);

        let critiques = self.collect_critiques(&event, responses).await;
        let converged = converged(&critiques);
        let status = if converged {
            ReviewStatus::Resolved
        } else {
            ReviewStatus::Unresolved
        };

        let mut peer_review = PeerReview {
            id: NodeId::new(),
            event_id,
            status,
            causal_trace: merged_causal_trace(responses),
            agent_priority: responses.iter().map(|r| r.agent_priority).fold(0.0, f64::max),
            user_pinned: responses.iter().any(|r| r.user_pinned),
            value_schema_version: responses[0].value_schema_version(),
            critiques,
            timestamp: Utc::now(),
        };
        peer_review.id = self.write_node(NodeLabel::PeerReview, &peer_review).await?;
        self.repository
            .create_relationship(peer_review.id, event_id, links::REVIEWS, Properties::new())
            .await?;

        info!(
            event_id = %event_id,
            peer_review_id = %peer_review.id,
            status = %status,
            dissenting = ?peer_review.dissenting_agents(),
            "Peer review completed"
        );
        self.event_bus.publish(CortexEvent::PeerReviewCompleted {
            event_id,
            peer_review_id: peer_review.id,
            status,
            timestamp: peer_review.timestamp,
        });

        if converged {
            let consensus = self.builder.build_consensus(Some(event_id), responses).await?;
            let consensus_id = match &consensus {
                Some(consensus) => Some(self.builder.write_consensus(consensus).await?),
                None => None,
            };
            return Ok(ReviewOutcome {
                peer_review,
                consensus,
                consensus_id,
                conflict: None,
            });
        }

        let conflict = self.escalate(&peer_review).await?;
        Ok(ReviewOutcome {
            peer_review,
            consensus: None,
            consensus_id: None,
            conflict: Some(conflict),
        })
    }

    /// Ask every agent concurrently; results keep input order
    async fn collect_critiques(&self, event: &Arc<MemoryRecord>, responses: &[AgentResponse]) -> Vec<Critique> {
        let mut handles = Vec::with_capacity(responses.len());
        for (index, own) in responses.iter().enumerate() {
            let name = own.agent_name.clone();
            let Some(agent) = self.agents.get(&name) else {
                handles.push((name, None));
                continue;
            };

            let event = event.clone();
            let own = own.clone();
            let peers: Vec<AgentResponse> = responses
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, r)| r.clone())
                .collect();
            let handle = tokio::spawn(async move { agent.review(&event, &own, &peers).await });
            handles.push((name, Some(handle)));
        }

        let mut critiques = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let critique = match handle {
                None => {
                    warn!(agent = %name, "Agent not registered, counting its critique as a shift");
                    Critique::unavailable(name, "agent not registered")
                }
                Some(handle) => match handle.await {
                    Ok(Ok(reply)) => Critique {
                        agent_name: name,
                        revised_rationale: reply.revised_rationale,
                        value_vector_diff: reply.value_vector_diff,
                        emotion_vector_diff: reply.emotion_vector_diff,
                        shifted: reply.shifted,
                        error: None,
                    },
                    Ok(Err(e)) => {
                        warn!(agent = %name, error = %e, "Critique failed");
                        Critique::unavailable(name, e.to_string())
                    }
                    Err(e) => {
                        warn!(agent = %name, error = %e, "Critique task failed");
                        Critique::unavailable(name, e.to_string())
                    }
                },
            };
            critiques.push(critique);
        }
        critiques
    }

    /// Open a conflict and link it to the event and the dissenting agents
    async fn escalate(&self, peer_review: &PeerReview) -> CortexResult<ConflictEvent> {
        // queried fresh so taxonomy changes are seen without a restart
        let known = self.taxonomy.known_types().await?;
        let edge_type = select_link_type(&known, links::CONTRADICTS, LinkClass::Contradiction);
        let agent_edge_type = select_link_type(&known, links::CONTRADICTS_AGENT, LinkClass::AgentContradiction);

        let mut conflict = ConflictEvent {
            id: NodeId::new(),
            event_id: peer_review.event_id,
            peer_review_id: peer_review.id,
            status: ConflictStatus::Open,
            critiques: peer_review.critiques.clone(),
            causal_trace: peer_review.causal_trace.clone(),
            edge_type: edge_type.clone(),
            timestamp: Utc::now(),
        };
        conflict.id = self.write_node(NodeLabel::ConflictEvent, &conflict).await?;

        let mut properties = Properties::new();
        properties.insert("peer_review_id".into(), json!(peer_review.id));
        properties.insert("value_schema_version".into(), json!(peer_review.value_schema_version));
        self.repository
            .create_relationship(conflict.id, peer_review.event_id, &edge_type, properties)
            .await?;

        for agent_name in peer_review.dissenting_agents() {
            let descriptor = self.agents.get(agent_name).map(|a| a.descriptor().clone());
            let agent_node = ensure_agent_node(self.repository.as_ref(), agent_name, descriptor.as_ref()).await?;
            let mut properties = Properties::new();
            properties.insert("agent_name".into(), json!(agent_name));
            self.repository
                .create_relationship(conflict.id, agent_node, &agent_edge_type, properties)
                .await?;
        }

        warn!(
            event_id = %conflict.event_id,
            conflict_id = %conflict.id,
            edge_type = %edge_type,
            "Conflict escalated for external resolution"
        );
        self.event_bus.publish(CortexEvent::ConflictEscalated {
            event_id: conflict.event_id,
            conflict_id: conflict.id,
            edge_type,
            timestamp: conflict.timestamp,
        });
        Ok(conflict)
    }

    /// Create the node and store its own id inside the property bag
    async fn write_node<T: serde::Serialize>(&self, label: NodeLabel, record: &T) -> CortexResult<NodeId> {
        let mut properties = to_properties(record)?;
        properties.remove("id");
        let node = self.repository.create_node(label, properties).await?;
        let mut id = Properties::new();
        id.insert("id".into(), json!(node.id));
        self.repository.update_node(node.id, id).await?;
        Ok(node.id)
    }
}

/// Every critique must report no shift; an empty round never converges
pub fn converged(critiques: &[Critique]) -> bool {
    !critiques.is_empty() && critiques.iter().all(|c| !c.shifted)
}

/// Union of the responses' causal traces, first occurrence wins
pub fn merged_causal_trace(responses: &[AgentResponse]) -> Vec<NodeId> {
    let mut trace = Vec::new();
    for id in responses.iter().flat_map(|r| r.causal_trace.iter()) {
        if !trace.contains(id) {
            trace.push(*id);
        }
    }
    trace
}
