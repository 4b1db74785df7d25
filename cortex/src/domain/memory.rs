// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Memory records and the scoring and decay arithmetic behind their lifecycle
//!
//! An event enters as an unscored [`MemoryRecord`] with kind
//! [`MemoryKind::Event`]. Evaluation assigns it a relevance score; events
//! scoring above the promotion threshold are copied into a
//! [`MemoryKind::CoreMemory`]. Every maintenance cycle decays the score
//! exponentially with elapsed time and archives the branch once it drops
//! below the prune threshold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AuditLog;
use super::errors::RepositoryError;
use super::graph::{GraphNode, NodeId, NodeLabel};
use super::vector::{clamp_unit, Emotion, EmotionVector, Valence, ValueVector};

/// Weights of the evaluation formula
pub mod weights {
    pub const RELEVANCE: f64 = 0.45;
    pub const NOVELTY: f64 = 0.18;
    pub const ALIGNMENT: f64 = 0.20;
    pub const EMOTION: f64 = 0.12;
    pub const META: f64 = 0.05;
}

/// Signal used when a score input is unknown
pub const NEUTRAL_SIGNAL: f64 = 0.5;
pub const PINNED_META_WEIGHT: f64 = 0.1;
pub const CORE_MEMORY_BONUS: f64 = 0.1;
pub const ACTIVE_THEME_BONUS: f64 = 0.1;

const CORE_MEMORY_DECAY_FACTOR: f64 = 0.3;
const PINNED_DECAY_FACTOR: f64 = 0.2;
const EMOTIONAL_DECAY_FACTOR: f64 = 0.6;
const EMOTIONAL_INTENSITY_CUTOFF: f64 = 0.75;
const PRIORITY_DECAY_FACTOR: f64 = 0.7;
const PRIORITY_CUTOFF: f64 = 0.7;
const LINK_DECAY_STEP: f64 = 0.04;
const LINK_DECAY_MIN_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    #[default]
    Event,
    CoreMemory,
}

impl MemoryKind {
    pub fn label(&self) -> NodeLabel {
        match self {
            MemoryKind::Event => NodeLabel::Event,
            MemoryKind::CoreMemory => NodeLabel::CoreMemory,
        }
    }
}

/// An event or promoted core memory as stored in the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryRecord {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(skip)]
    pub kind: MemoryKind,
    #[serde(skip)]
    pub archived: bool,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,

    pub raw_text: String,
    pub summary: Option<String>,
    /// Consensus rationale, set on promotion
    pub rationale: Option<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,

    /// Unset until the first evaluation
    pub relevance_score: Option<f64>,
    pub novelty_score: Option<f64>,
    pub agent_alignment: Option<f64>,
    pub agent_priority: Option<f64>,
    /// Per-record override of the base promotion threshold
    pub promotion_threshold: Option<f64>,

    pub emotion_vector: EmotionVector,
    pub value_vector: ValueVector,
    pub decay_rate: Option<f64>,
    pub last_evaluated: Option<DateTime<Utc>>,
    pub audit_log: AuditLog,

    pub user_pinned: bool,
    pub promoted: bool,
    pub resurfaced: bool,
    pub causal_trace: Vec<NodeId>,
    pub linked_context: Vec<NodeId>,
    pub source_event_id: Option<NodeId>,

    pub emotion_tag: Option<Emotion>,
    pub emotion_valence: Option<Valence>,
    pub embedding: Option<Vec<f32>>,

    pub pruned_reason: Option<String>,
    pub pruned_timestamp: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    pub fn from_node(node: &GraphNode) -> Result<Self, RepositoryError> {
        let kind = match node.label {
            NodeLabel::Event => MemoryKind::Event,
            NodeLabel::CoreMemory => MemoryKind::CoreMemory,
            other => {
                return Err(RepositoryError::Serialization(format!(
                    "node {} is a {}, not a memory",
                    node.id, other
                )))
            }
        };

        let mut record: MemoryRecord = node.decode()?;
        record.id = node.id;
        record.kind = kind;
        record.archived = node.archived;
        record.created_at = node.created_at;
        Ok(record)
    }

    pub fn is_core(&self) -> bool {
        self.kind == MemoryKind::CoreMemory
    }

    pub fn summary_or_text(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.raw_text)
    }

    pub fn has_tag(&self, theme: &str) -> bool {
        self.tags
            .iter()
            .chain(self.topics.iter())
            .any(|tag| tag.eq_ignore_ascii_case(theme))
    }

    /// Reference point for elapsed-time decay
    pub fn decay_reference(&self) -> DateTime<Utc> {
        self.last_evaluated.unwrap_or(self.created_at)
    }
}

/// Input for creating a new event
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub raw_text: String,
    pub summary: Option<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub user_pinned: bool,
    pub causal_trace: Vec<NodeId>,
}

impl NewEvent {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.user_pinned = pinned;
        self
    }
}

/// Caller-supplied signals for an evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub active_theme: Option<String>,
    pub novelty: Option<f64>,
    /// External agent-alignment signal
    pub alignment: Option<f64>,
    pub agent_priority: Option<f64>,
    /// Copied onto the core memory if the event is promoted
    pub rationale: Option<String>,
}

/// Inputs of one evaluation, recorded verbatim in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub relevance: f64,
    pub novelty: f64,
    pub alignment: f64,
    pub max_emotion: f64,
    pub meta_weight: f64,
}

impl ScoreInputs {
    pub fn for_record(record: &MemoryRecord, context: &EvaluationContext) -> Self {
        let mut relevance = record.relevance_score.unwrap_or(NEUTRAL_SIGNAL);
        if record.is_core() {
            relevance += CORE_MEMORY_BONUS;
        }
        if let Some(theme) = &context.active_theme {
            if record.has_tag(theme) {
                relevance += ACTIVE_THEME_BONUS;
            }
        }

        let novelty = record
            .novelty_score
            .or(context.novelty)
            .unwrap_or(NEUTRAL_SIGNAL);
        let alignment = context
            .alignment
            .or(record.agent_alignment)
            .unwrap_or(NEUTRAL_SIGNAL);
        let max_emotion = record.emotion_vector.max_intensity().unwrap_or(NEUTRAL_SIGNAL);
        let meta_weight = if record.user_pinned {
            PINNED_META_WEIGHT
        } else {
            0.0
        };

        Self {
            relevance: relevance.min(1.0),
            novelty: clamp_unit(novelty),
            alignment: clamp_unit(alignment),
            max_emotion,
            meta_weight,
        }
    }

    pub fn score(&self) -> f64 {
        weights::RELEVANCE * self.relevance
            + weights::NOVELTY * self.novelty
            + weights::ALIGNMENT * self.alignment
            + weights::EMOTION * self.max_emotion
            + weights::META * self.meta_weight
    }
}

/// Promotion bar, lowered for higher-priority agents
pub fn promotion_threshold(base: f64, priority_discount: f64, agent_priority: Option<f64>) -> f64 {
    match agent_priority {
        Some(priority) => base - priority_discount * clamp_unit(priority),
        None => base,
    }
}

/// Exponential decay over elapsed days
pub fn decayed_score(score: f64, decay_rate: f64, days: f64) -> f64 {
    score * (-decay_rate * days.max(0.0)).exp()
}

/// Computes per-record decay rates from a base rate
#[derive(Debug, Clone, Copy)]
pub struct DecayPolicy {
    pub base_rate: f64,
    pub floor: f64,
}

impl DecayPolicy {
    pub fn rate_for(&self, record: &MemoryRecord, link_count: usize) -> f64 {
        let mut rate = self.base_rate;
        if record.is_core() {
            rate *= CORE_MEMORY_DECAY_FACTOR;
        }
        if record.user_pinned {
            rate *= PINNED_DECAY_FACTOR;
        }
        if record
            .emotion_vector
            .max_intensity()
            .is_some_and(|max| max > EMOTIONAL_INTENSITY_CUTOFF)
        {
            rate *= EMOTIONAL_DECAY_FACTOR;
        }
        if record.agent_priority.is_some_and(|p| p > PRIORITY_CUTOFF) {
            rate *= PRIORITY_DECAY_FACTOR;
        }
        rate *= (1.0 - LINK_DECAY_STEP * link_count as f64).max(LINK_DECAY_MIN_FACTOR);

        rate.max(self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_priority_lowers_promotion_threshold() {
        let threshold = promotion_threshold(0.85, 0.04, Some(1.0));
        assert!(approx(threshold, 0.81));
        assert!(0.83 >= threshold);
        assert!(0.79 < threshold);

        assert_eq!(promotion_threshold(0.85, 0.04, None), 0.85);
    }

    #[test]
    fn test_neutral_inputs_score() {
        let record = MemoryRecord::default();
        let inputs = ScoreInputs::for_record(&record, &EvaluationContext::default());
        assert_eq!(inputs.relevance, 0.5);
        assert_eq!(inputs.meta_weight, 0.0);
        // 0.5 * (0.45 + 0.18 + 0.20 + 0.12)
        assert!(approx(inputs.score(), 0.475));
    }

    #[test]
    fn test_relevance_bonuses_cap_at_one() {
        let record = MemoryRecord {
            kind: MemoryKind::CoreMemory,
            relevance_score: Some(0.95),
            tags: vec!["Ocean".into()],
            user_pinned: true,
            ..MemoryRecord::default()
        };
        let context = EvaluationContext {
            active_theme: Some("ocean".into()),
            ..EvaluationContext::default()
        };
        let inputs = ScoreInputs::for_record(&record, &context);
        assert_eq!(inputs.relevance, 1.0);
        assert_eq!(inputs.meta_weight, PINNED_META_WEIGHT);
    }

    #[test]
    fn test_stored_novelty_wins_over_context() {
        let record = MemoryRecord {
            novelty_score: Some(0.9),
            agent_alignment: Some(0.2),
            ..MemoryRecord::default()
        };
        let context = EvaluationContext {
            novelty: Some(0.1),
            alignment: Some(0.7),
            ..EvaluationContext::default()
        };
        let inputs = ScoreInputs::for_record(&record, &context);
        assert_eq!(inputs.novelty, 0.9);
        assert_eq!(inputs.alignment, 0.7);
    }

    #[test]
    fn test_decay_with_no_elapsed_time_is_identity() {
        assert_eq!(decayed_score(0.6, 0.03, 0.0), 0.6);
        assert!(decayed_score(0.6, 0.03, 10.0) < 0.6);
    }

    #[test]
    fn test_decay_rate_multipliers_compose() {
        let policy = DecayPolicy {
            base_rate: 0.03,
            floor: 0.0,
        };

        let plain = MemoryRecord::default();
        assert!(approx(policy.rate_for(&plain, 0), 0.03));

        let pinned_core = MemoryRecord {
            kind: MemoryKind::CoreMemory,
            user_pinned: true,
            emotion_vector: EmotionVector::from_scores([(Emotion::Love, 0.9)]),
            agent_priority: Some(0.8),
            ..MemoryRecord::default()
        };
        let expected = 0.03 * 0.3 * 0.2 * 0.6 * 0.7;
        assert!(approx(policy.rate_for(&pinned_core, 0), expected));

        // links reduce the rate, bottoming out at half
        assert!(approx(policy.rate_for(&plain, 5), 0.03 * 0.8));
        assert!(approx(policy.rate_for(&plain, 40), 0.03 * 0.5));
    }

    #[test]
    fn test_decay_rate_respects_floor() {
        let policy = DecayPolicy {
            base_rate: 0.03,
            floor: 0.01,
        };
        let pinned = MemoryRecord {
            user_pinned: true,
            ..MemoryRecord::default()
        };
        assert_eq!(policy.rate_for(&pinned, 0), 0.01);
    }

    #[test]
    fn test_record_round_trips_through_node() {
        let record = MemoryRecord {
            raw_text: "tide pools at dawn".into(),
            topics: vec!["ocean".into()],
            relevance_score: Some(0.4),
            ..MemoryRecord::default()
        };
        let properties = crate::domain::graph::to_properties(&record).unwrap();
        let node = GraphNode::new(NodeLabel::CoreMemory, properties);

        let restored = MemoryRecord::from_node(&node).unwrap();
        assert_eq!(restored.id, node.id);
        assert!(restored.is_core());
        assert_eq!(restored.raw_text, "tide pools at dawn");
        assert_eq!(restored.relevance_score, Some(0.4));
    }

    #[test]
    fn test_non_memory_node_is_rejected() {
        let node = GraphNode::new(NodeLabel::Agent, Default::default());
        assert!(MemoryRecord::from_node(&node).is_err());
    }
}
