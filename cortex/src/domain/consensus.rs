// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consensus and conflict detection results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::agent::{ActionPlan, AuditLog};
use super::graph::NodeId;
use super::vector::ValueVector;

/// Fused reading of an event produced when agents agree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub event_id: Option<NodeId>,
    pub rationale: String,
    pub consensus_score: f64,
    pub agent_names: Vec<String>,
    pub action_plan: Option<ActionPlan>,
    /// Tagged with the schema version of the fused responses
    pub value_vector: ValueVector,
    pub audit_log: AuditLog,
}

/// Which check flagged a set of responses as divergent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum ConflictTrigger {
    ScoreSpread { spread: f64 },
    RationaleDivergence,
    ValueDivergence { axes: Vec<String> },
    EmotionDivergence { divergence: f64 },
}

impl fmt::Display for ConflictTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictTrigger::ScoreSpread { spread } => write!(f, "score_spread({:.3})", spread),
            ConflictTrigger::RationaleDivergence => f.write_str("rationale_divergence"),
            ConflictTrigger::ValueDivergence { axes } => {
                write!(f, "value_divergence({})", axes.join(","))
            }
            ConflictTrigger::EmotionDivergence { divergence } => {
                write!(f, "emotion_divergence({:.3})", divergence)
            }
        }
    }
}

/// Outcome of running the conflict detector over a set of responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub needs_review: bool,
    pub triggers: Vec<ConflictTrigger>,
    pub conflict_axes: Vec<String>,
    pub score_spread: f64,
    /// Mean absolute per-axis difference across all response pairs
    pub mean_divergence: f64,
    /// `1 - mean pairwise cosine` over emotion vectors, when at least two were present
    pub emotion_divergence: Option<f64>,
}

impl ConflictReport {
    pub fn no_conflict() -> Self {
        Self::default()
    }
}

/// Pairwise comparison of two value vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConflict {
    pub diffs: BTreeMap<String, f64>,
    pub conflict_axes: Vec<String>,
    /// `1 - mean diff`
    pub agreement: f64,
    pub max_diff: f64,
}

impl VectorConflict {
    pub fn is_conflict(&self) -> bool {
        !self.conflict_axes.is_empty()
    }
}
