// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Consensus Builder
//!
//! Fuses aligned agent responses into one reading of an event:
//!
//! - rationale: `[agent] rationale` lines in input order
//! - score: arithmetic mean
//! - value vector: importance-weighted average per axis, normalised by the
//!   importance summed over the contributing agents
//! - action plan: the first one proposed, by input order
//!
//! Axes whose fused score clears the bump threshold have their importance
//! raised in the value schema, so consensus reinforces what it expresses.

use chrono::Utc;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::agent::{AgentResponse, AuditLog};
use crate::domain::config::ConsensusConfig;
use crate::domain::consensus::Consensus;
use crate::domain::errors::{CortexError, CortexResult};
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{links, to_properties, NodeId, NodeLabel, Properties};
use crate::domain::repository::GraphRepository;
use crate::domain::value::ValueSchema;
use crate::domain::vector::{clamp_unit, ValueVector};

use super::value_schema::ValueSchemaRegistry;

/// Weighted fusion of value vectors scored under one schema version.
///
/// Axes are the union of those present in any vector; an agent that omits an
/// axis contributes `0.0` to it. Weights come from `schema`. An axis with no
/// positive importance falls back to the plain mean.
pub fn fuse_value_vectors(vectors: &[&ValueVector], schema: &ValueSchema) -> CortexResult<ValueVector> {
    let Some(first) = vectors.first() else {
        return Ok(ValueVector::new(schema.version));
    };
    let version = first.schema_version;
    if let Some(other) = vectors.iter().find(|v| v.schema_version != version) {
        return Err(CortexError::SchemaVersionMismatch {
            expected: version,
            found: other.schema_version,
        });
    }

    let axes: BTreeSet<&str> = vectors.iter().flat_map(|v| v.axes()).collect();
    let count = vectors.len() as f64;

    let scores = axes.into_iter().map(|axis| {
        let importance = schema.axis(axis).map(|a| a.importance).unwrap_or(0.0);
        let sum: f64 = vectors.iter().map(|v| v.get(axis)).sum();
        let fused = if importance > 0.0 {
            (sum * importance) / (importance * count)
        } else {
            sum / count
        };
        (axis.to_string(), clamp_unit(fused))
    });

    Ok(ValueVector::with_scores(version, scores))
}

/// Deterministic assembly of a consensus. `None` when there is nothing to build.
pub fn assemble_consensus(
    event_id: Option<NodeId>,
    responses: &[AgentResponse],
    schema: &ValueSchema,
) -> CortexResult<Option<Consensus>> {
    if responses.is_empty() {
        return Ok(None);
    }

    let rationale = responses
        .iter()
        .map(|r| format!("[{}] {}", r.agent_name, r.rationale))
        .collect::<Vec<_>>()
        .join("\n");
    let consensus_score = responses.iter().map(|r| r.score).sum::<f64>() / responses.len() as f64;
    let agent_names: Vec<String> = responses.iter().map(|r| r.agent_name.clone()).collect();
    let action_plan = responses.iter().find_map(|r| r.action_plan.clone());

    let vectors: Vec<&ValueVector> = responses.iter().map(|r| &r.value_vector).collect();
    let value_vector = fuse_value_vectors(&vectors, schema)?;

    let mut audit_log = AuditLog::new();
    audit_log.append(
        "consensus_built",
        json!({
            "agent_names": agent_names,
            "rationales": responses.iter().map(|r| r.rationale.as_str()).collect::<Vec<_>>(),
            "value_schema_version": value_vector.schema_version,
        }),
    );

    Ok(Some(Consensus {
        event_id,
        rationale,
        consensus_score,
        agent_names,
        action_plan,
        value_vector,
        audit_log,
    }))
}

pub struct ConsensusBuilder {
    registry: Arc<ValueSchemaRegistry>,
    repository: Arc<dyn GraphRepository>,
    event_bus: Arc<dyn EventBus>,
    config: ConsensusConfig,
}

impl ConsensusBuilder {
    pub fn new(
        registry: Arc<ValueSchemaRegistry>,
        repository: Arc<dyn GraphRepository>,
        event_bus: Arc<dyn EventBus>,
        config: ConsensusConfig,
    ) -> Self {
        Self {
            registry,
            repository,
            event_bus,
            config,
        }
    }

    /// Build a consensus and reinforce the axes it expresses strongly
    pub async fn build_consensus(
        &self,
        event_id: Option<NodeId>,
        responses: &[AgentResponse],
    ) -> CortexResult<Option<Consensus>> {
        let schema = self.registry.get_pool().await?;
        let Some(mut consensus) = assemble_consensus(event_id, responses, &schema)? else {
            debug!("No responses, nothing to build");
            return Ok(None);
        };

        let bumped = self.reinforce(&consensus.value_vector, &schema).await?;
        if !bumped.is_empty() {
            consensus
                .audit_log
                .append("importance_bumped", json!({ "axes": bumped }));
        }

        info!(
            agents = consensus.agent_names.len(),
            score = consensus.consensus_score,
            version = %consensus.value_vector.schema_version,
            "Consensus built"
        );
        Ok(Some(consensus))
    }

    /// Persist a consensus linked `CONSENSUS_FOR` to its event
    pub async fn write_consensus(&self, consensus: &Consensus) -> CortexResult<NodeId> {
        let mut properties = to_properties(consensus)?;
        properties.insert("created_at".into(), json!(Utc::now()));
        let node = self
            .repository
            .create_node(NodeLabel::Consensus, properties)
            .await?;

        if let Some(event_id) = consensus.event_id {
            self.repository
                .create_relationship(node.id, event_id, links::CONSENSUS_FOR, Properties::new())
                .await?;
        }

        self.event_bus.publish(CortexEvent::ConsensusReached {
            event_id: consensus.event_id,
            consensus_id: node.id,
            consensus_score: consensus.consensus_score,
            agent_count: consensus.agent_names.len(),
            timestamp: Utc::now(),
        });
        Ok(node.id)
    }

    async fn reinforce(&self, fused: &ValueVector, schema: &ValueSchema) -> CortexResult<Vec<String>> {
        let mut bumped = Vec::new();
        for (axis, score) in &fused.scores {
            if *score <= self.config.importance_bump_threshold {
                continue;
            }
            if !schema.is_known(axis) {
                debug!(axis = %axis, "Skipping bump for axis outside the active schema");
                continue;
            }
            let importance = self
                .registry
                .bump_importance(axis, self.config.importance_bump_amount, self.config.importance_cap)
                .await?;
            debug!(axis = %axis, importance, "Axis importance reinforced by consensus");
            bumped.push(axis.clone());
        }
        Ok(bumped)
    }
}
