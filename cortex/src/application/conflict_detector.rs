// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conflict Detector
//!
//! Decides whether a set of agent responses diverges enough to need peer
//! review. Four independent checks are OR-ed together:
//!
//! - score spread above the threshold
//! - any two rationales that are not byte-identical
//! - any axis differing by more than the threshold between any pair of value vectors
//! - `1 - mean pairwise cosine` of the emotion vectors above the threshold
//!
//! Fewer than two responses never conflict.

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::domain::agent::AgentResponse;
use crate::domain::consensus::{ConflictReport, ConflictTrigger, VectorConflict};
use crate::domain::vector::{EmotionVector, ValueVector};

/// Result of comparing every pair in a set of value vectors
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDivergence {
    pub conflict_axes: Vec<String>,
    /// Mean absolute difference over every pair and every axis present
    pub mean_divergence: f64,
}

/// Compare two value vectors axis by axis over the union of their keys
pub fn value_vector_conflict(a: &ValueVector, b: &ValueVector, threshold: f64) -> VectorConflict {
    let diffs = a.abs_diff(b);
    let conflict_axes = diffs
        .iter()
        .filter(|(_, diff)| **diff > threshold)
        .map(|(axis, _)| axis.clone())
        .collect();
    let max_diff = diffs.values().copied().fold(0.0, f64::max);
    let mean_diff = if diffs.is_empty() {
        0.0
    } else {
        diffs.values().sum::<f64>() / diffs.len() as f64
    };

    VectorConflict {
        diffs,
        conflict_axes,
        agreement: 1.0 - mean_diff,
        max_diff,
    }
}

/// Pairwise comparison across N value vectors
pub fn multi_vector_conflict(vectors: &[&ValueVector], threshold: f64) -> MeshDivergence {
    let axes: BTreeSet<&str> = vectors.iter().flat_map(|v| v.axes()).collect();
    let mut conflict_axes = BTreeSet::new();
    let mut total = 0.0;
    let mut cells = 0usize;

    for (i, a) in vectors.iter().enumerate() {
        for b in &vectors[i + 1..] {
            for axis in &axes {
                let diff = (a.get(axis) - b.get(axis)).abs();
                if diff > threshold {
                    conflict_axes.insert(axis.to_string());
                }
                total += diff;
                cells += 1;
            }
        }
    }

    MeshDivergence {
        conflict_axes: conflict_axes.into_iter().collect(),
        mean_divergence: if cells == 0 { 0.0 } else { total / cells as f64 },
    }
}

/// `1 - mean pairwise cosine` over the non-empty vectors, or `None` when
/// fewer than two carry any signal
pub fn emotion_divergence(vectors: &[&EmotionVector]) -> Option<f64> {
    let present: Vec<&EmotionVector> = vectors.iter().copied().filter(|v| !v.is_empty()).collect();
    if present.len() < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in present.iter().enumerate() {
        for b in &present[i + 1..] {
            total += a.cosine_similarity(b);
            pairs += 1;
        }
    }
    Some(1.0 - total / pairs as f64)
}

#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    threshold: f64,
}

impl ConflictDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect(&self, responses: &[AgentResponse]) -> ConflictReport {
        if responses.len() < 2 {
            debug!(count = responses.len(), "Fewer than two responses, nothing to disagree about");
            return ConflictReport::no_conflict();
        }

        let mut triggers = Vec::new();

        let (min, max) = responses
            .iter()
            .map(|r| r.score)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s), hi.max(s)));
        let score_spread = max - min;
        if score_spread > self.threshold {
            triggers.push(ConflictTrigger::ScoreSpread { spread: score_spread });
        }

        let first = &responses[0].rationale;
        if responses.iter().any(|r| &r.rationale != first) {
            triggers.push(ConflictTrigger::RationaleDivergence);
        }

        let value_vectors: Vec<&ValueVector> = responses.iter().map(|r| &r.value_vector).collect();
        let mesh = multi_vector_conflict(&value_vectors, self.threshold);
        if !mesh.conflict_axes.is_empty() {
            triggers.push(ConflictTrigger::ValueDivergence {
                axes: mesh.conflict_axes.clone(),
            });
        }

        let emotion_vectors: Vec<&EmotionVector> = responses.iter().map(|r| &r.emotion_vector).collect();
        let emotion_divergence = emotion_divergence(&emotion_vectors);
        if let Some(divergence) = emotion_divergence {
            if divergence > self.threshold {
                triggers.push(ConflictTrigger::EmotionDivergence { divergence });
            }
        }

        let needs_review = !triggers.is_empty();
        if needs_review {
            info!(
                agents = responses.len(),
                triggers = %triggers.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", "),
                "Agent responses diverge"
            );
        } else {
            debug!(agents = responses.len(), "Agent responses agree");
        }

        ConflictReport {
            needs_review,
            triggers,
            conflict_axes: mesh.conflict_axes,
            score_spread,
            mean_divergence: mesh.mean_divergence,
            emotion_divergence,
        }
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(0.5)
    }
}
