// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reasoning agents, their responses, and the append-only audit log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::graph::NodeId;
use super::vector::{clamp_unit, EmotionVector, SchemaVersion, ValueVector};

/// Immutable audit entry. `sequence` is the stable ordering key within its log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Value,
}

/// Append-only audit log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the next sequence number
    pub fn append(&mut self, action: impl Into<String>, details: Value) -> &AuditEntry {
        self.append_at(action, details, Utc::now())
    }

    pub fn append_at(
        &mut self,
        action: impl Into<String>,
        details: Value,
        timestamp: DateTime<Utc>,
    ) -> &AuditEntry {
        let sequence = self.entries.last().map(|e| e.sequence + 1).unwrap_or(1);
        self.entries.push(AuditEntry {
            sequence,
            action: action.into(),
            timestamp,
            details,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Action proposed by an agent. Dispatching it belongs to the actuator layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub action_type: String,
    #[serde(default)]
    pub details: Value,
}

impl ActionPlan {
    /// Plans that mutate the graph schema are deferred rather than dispatched
    pub fn is_deferred(&self) -> bool {
        matches!(self.action_type.as_str(), "cypher" | "schema")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub Uuid);

impl ResponseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResponseId {
    fn default() -> Self {
        Self::new()
    }
}

/// One agent's reading of one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub id: ResponseId,
    pub agent_name: String,
    pub rationale: String,
    pub score: f64,
    pub value_vector: ValueVector,
    pub emotion_vector: EmotionVector,
    pub action_plan: Option<ActionPlan>,
    pub causal_trace: Vec<NodeId>,
    pub agent_priority: f64,
    pub user_pinned: bool,
    /// Set when the agent failed; such responses carry no signal
    pub error: Option<String>,
    pub audit_log: AuditLog,
}

impl AgentResponse {
    pub fn new(
        agent_name: impl Into<String>,
        rationale: impl Into<String>,
        score: f64,
        value_vector: ValueVector,
        emotion_vector: EmotionVector,
    ) -> Self {
        Self {
            id: ResponseId::new(),
            agent_name: agent_name.into(),
            rationale: rationale.into(),
            score: clamp_unit(score),
            value_vector,
            emotion_vector,
            action_plan: None,
            causal_trace: Vec::new(),
            agent_priority: 0.0,
            user_pinned: false,
            error: None,
            audit_log: AuditLog::new(),
        }
    }

    /// Placeholder recorded when an agent raised instead of answering
    pub fn failed(
        agent_name: impl Into<String>,
        error: impl Into<String>,
        schema_version: SchemaVersion,
    ) -> Self {
        let mut response = Self::new(
            agent_name,
            String::new(),
            0.0,
            ValueVector::new(schema_version),
            EmotionVector::new(),
        );
        let error = error.into();
        response
            .audit_log
            .append("agent_failed", serde_json::json!({ "error": error }));
        response.error = Some(error);
        response
    }

    pub fn with_action_plan(mut self, plan: ActionPlan) -> Self {
        self.action_plan = Some(plan);
        self
    }

    pub fn with_causal_trace(mut self, trace: Vec<NodeId>) -> Self {
        self.causal_trace = trace;
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.agent_priority = clamp_unit(priority);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.user_pinned = pinned;
        self
    }

    pub fn value_schema_version(&self) -> SchemaVersion {
        self.value_vector.schema_version
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Inactive,
}

/// Registry entry describing a reasoning agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    /// Model alias resolved by the language-model gateway
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub priority: f64,
    pub status: AgentStatus,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: String::new(),
            model: None,
            priority: 0.0,
            status: AgentStatus::Active,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = clamp_unit(priority);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An agent's answer to a critique round. `shifted = false` is a vote that
/// the agent's position did not move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueReply {
    #[serde(default)]
    pub revised_rationale: String,
    #[serde(default)]
    pub value_vector_diff: BTreeMap<String, f64>,
    #[serde(default)]
    pub emotion_vector_diff: BTreeMap<String, f64>,
    /// Missing means the agent could not confirm it held its position
    #[serde(default = "default_shifted")]
    pub shifted: bool,
}

fn default_shifted() -> bool {
    true
}
