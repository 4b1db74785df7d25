// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Peer review records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::graph::NodeId;
use super::vector::SchemaVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Resolved,
    Unresolved,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Resolved => f.write_str("resolved"),
            ReviewStatus::Unresolved => f.write_str("unresolved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Open,
    Resolved,
}

/// One agent's contribution to a critique round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub agent_name: String,
    pub revised_rationale: String,
    pub value_vector_diff: BTreeMap<String, f64>,
    pub emotion_vector_diff: BTreeMap<String, f64>,
    pub shifted: bool,
    /// Set when the agent could not be asked or failed to answer
    #[serde(default)]
    pub error: Option<String>,
}

impl Critique {
    /// A critique that could not be obtained counts as a shift, so it can
    /// never produce a false convergence.
    pub fn unavailable(agent_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            revised_rationale: String::new(),
            value_vector_diff: BTreeMap::new(),
            emotion_vector_diff: BTreeMap::new(),
            shifted: true,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerReview {
    pub id: NodeId,
    pub event_id: NodeId,
    pub status: ReviewStatus,
    pub critiques: Vec<Critique>,
    pub causal_trace: Vec<NodeId>,
    pub agent_priority: f64,
    pub user_pinned: bool,
    pub value_schema_version: SchemaVersion,
    pub timestamp: DateTime<Utc>,
}

impl PeerReview {
    pub fn converged(&self) -> bool {
        self.status == ReviewStatus::Resolved
    }

    /// Agents whose critique reported a shift
    pub fn dissenting_agents(&self) -> Vec<&str> {
        self.critiques
            .iter()
            .filter(|c| c.shifted)
            .map(|c| c.agent_name.as_str())
            .collect()
    }
}

/// Open disagreement left for external resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub id: NodeId,
    pub event_id: NodeId,
    pub peer_review_id: NodeId,
    pub status: ConflictStatus,
    pub critiques: Vec<Critique>,
    pub causal_trace: Vec<NodeId>,
    /// Contradiction edge type chosen from the taxonomy at escalation time
    pub edge_type: String,
    pub timestamp: DateTime<Utc>,
}
