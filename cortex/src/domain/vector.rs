// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Value and emotion vectors
//!
//! A [`ValueVector`] maps mutable value-axis names to scores in `[0, 1]` and is
//! always tagged with the [`SchemaVersion`] it was scored against. An
//! [`EmotionVector`] maps the fixed, closed set of [`Emotion`] axes to scores
//! in `[0, 1]`. Absent axes read as `0.0` in both.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Monotonically increasing version of the value-axis pool
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SchemaVersion(pub u64);

impl SchemaVersion {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Clamp a score into `[0, 1]`
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Cosine similarity of two equally sized vectors. Returns 1.0 when both are
/// all-zero and 0.0 when exactly one is.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => dot / (norm_a * norm_b),
    }
}

/// Per-axis score over the current value schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueVector {
    pub schema_version: SchemaVersion,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

impl ValueVector {
    pub fn new(schema_version: SchemaVersion) -> Self {
        Self {
            schema_version,
            scores: BTreeMap::new(),
        }
    }

    pub fn with_scores(
        schema_version: SchemaVersion,
        scores: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            schema_version,
            scores: scores.into_iter().collect(),
        }
    }

    /// Score for an axis, `0.0` when absent
    pub fn get(&self, axis: &str) -> f64 {
        self.scores.get(axis).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, axis: &str) -> bool {
        self.scores.contains_key(axis)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn axes(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    /// Cosine similarity over the union of both vectors' axes
    pub fn cosine_similarity(&self, other: &ValueVector) -> f64 {
        let axes: BTreeSet<&str> = self.axes().chain(other.axes()).collect();
        let a: Vec<f64> = axes.iter().map(|axis| self.get(axis)).collect();
        let b: Vec<f64> = axes.iter().map(|axis| other.get(axis)).collect();
        cosine_similarity(&a, &b)
    }

    /// Absolute per-axis difference over the union of both vectors' axes
    pub fn abs_diff(&self, other: &ValueVector) -> BTreeMap<String, f64> {
        let axes: BTreeSet<&str> = self.axes().chain(other.axes()).collect();
        axes.into_iter()
            .map(|axis| (axis.to_string(), (self.get(axis) - other.get(axis)).abs()))
            .collect()
    }
}

/// The fixed emotion axis set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Disgust,
    Surprise,
    Curiosity,
    Trust,
    Shame,
    Love,
}

impl Emotion {
    pub const ALL: [Emotion; 10] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Disgust,
        Emotion::Surprise,
        Emotion::Curiosity,
        Emotion::Trust,
        Emotion::Shame,
        Emotion::Love,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
            Emotion::Surprise => "surprise",
            Emotion::Curiosity => "curiosity",
            Emotion::Trust => "trust",
            Emotion::Shame => "shame",
            Emotion::Love => "love",
        }
    }

    /// Case-insensitive lookup by name
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.as_str().eq_ignore_ascii_case(name))
    }

    fn is_positive(&self) -> bool {
        matches!(
            self,
            Emotion::Joy | Emotion::Surprise | Emotion::Love | Emotion::Trust
        )
    }

    fn is_negative(&self) -> bool {
        matches!(
            self,
            Emotion::Sadness | Emotion::Anger | Emotion::Fear | Emotion::Disgust | Emotion::Shame
        )
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall emotional direction of an emotion vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    Positive,
    Negative,
    Mixed,
}

impl fmt::Display for Valence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Valence::Positive => f.write_str("positive"),
            Valence::Negative => f.write_str("negative"),
            Valence::Mixed => f.write_str("mixed"),
        }
    }
}

/// Difference between positive and negative mass needed to call a valence
const VALENCE_BAND: f64 = 0.15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionVector {
    pub scores: BTreeMap<Emotion, f64>,
}

impl EmotionVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scores(scores: impl IntoIterator<Item = (Emotion, f64)>) -> Self {
        Self {
            scores: scores
                .into_iter()
                .map(|(emotion, score)| (emotion, clamp_unit(score)))
                .collect(),
        }
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        self.scores.get(&emotion).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn max_intensity(&self) -> Option<f64> {
        self.scores.values().copied().reduce(f64::max)
    }

    /// Strongest emotion. Ties resolve to the earlier axis.
    pub fn dominant(&self) -> Option<(Emotion, f64)> {
        self.scores
            .iter()
            .fold(None, |best: Option<(Emotion, f64)>, (&emotion, &score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((emotion, score)),
            })
    }

    pub fn valence(&self) -> Valence {
        let positive: f64 = self
            .scores
            .iter()
            .filter(|(emotion, _)| emotion.is_positive())
            .map(|(_, score)| score)
            .sum();
        let negative: f64 = self
            .scores
            .iter()
            .filter(|(emotion, _)| emotion.is_negative())
            .map(|(_, score)| score)
            .sum();

        let balance = positive - negative;
        if balance > VALENCE_BAND {
            Valence::Positive
        } else if balance < -VALENCE_BAND {
            Valence::Negative
        } else {
            Valence::Mixed
        }
    }

    /// Cosine similarity over the union of keys present, missing keys padded with 0
    pub fn cosine_similarity(&self, other: &EmotionVector) -> f64 {
        let axes: BTreeSet<Emotion> = self
            .scores
            .keys()
            .chain(other.scores.keys())
            .copied()
            .collect();
        let a: Vec<f64> = axes.iter().map(|e| self.get(*e)).collect();
        let b: Vec<f64> = axes.iter().map(|e| other.get(*e)).collect();
        cosine_similarity(&a, &b)
    }

    pub fn abs_diff(&self, other: &EmotionVector) -> BTreeMap<String, f64> {
        let axes: BTreeSet<Emotion> = self
            .scores
            .keys()
            .chain(other.scores.keys())
            .copied()
            .collect();
        axes.into_iter()
            .map(|e| (e.as_str().to_string(), (self.get(e) - other.get(e)).abs()))
            .collect()
    }

    /// Per-axis arithmetic mean across vectors, absent axes counted as 0
    pub fn mean<'a>(vectors: impl IntoIterator<Item = &'a EmotionVector>) -> EmotionVector {
        let vectors: Vec<&EmotionVector> = vectors.into_iter().filter(|v| !v.is_empty()).collect();
        if vectors.is_empty() {
            return EmotionVector::default();
        }

        let count = vectors.len() as f64;
        let axes: BTreeSet<Emotion> = vectors
            .iter()
            .flat_map(|v| v.scores.keys().copied())
            .collect();

        EmotionVector::from_scores(axes.into_iter().map(|emotion| {
            let total: f64 = vectors.iter().map(|v| v.get(emotion)).sum();
            (emotion, total / count)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_parse_is_case_insensitive() {
        assert_eq!(Emotion::parse(" Joy "), Some(Emotion::Joy));
        assert_eq!(Emotion::parse("CURIOSITY"), Some(Emotion::Curiosity));
        assert_eq!(Emotion::parse("boredom"), None);
    }

    #[test]
    fn test_cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
    }

    #[test]
    fn test_value_vector_reads_absent_axes_as_zero() {
        let v = ValueVector::with_scores(SchemaVersion(2), [("empathy".to_string(), 0.8)]);
        assert_eq!(v.get("empathy"), 0.8);
        assert_eq!(v.get("courage"), 0.0);
    }

    #[test]
    fn test_value_vector_diff_covers_union() {
        let a = ValueVector::with_scores(SchemaVersion(1), [("empathy".to_string(), 0.9)]);
        let b = ValueVector::with_scores(SchemaVersion(1), [("courage".to_string(), 0.4)]);
        let diff = a.abs_diff(&b);
        assert_eq!(diff.len(), 2);
        assert!((diff["empathy"] - 0.9).abs() < 1e-12);
        assert!((diff["courage"] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_emotion_vector_dominant_and_valence() {
        let v = EmotionVector::from_scores([(Emotion::Joy, 0.9), (Emotion::Fear, 0.2)]);
        assert_eq!(v.dominant(), Some((Emotion::Joy, 0.9)));
        assert_eq!(v.valence(), Valence::Positive);

        let v = EmotionVector::from_scores([(Emotion::Anger, 0.7), (Emotion::Trust, 0.6)]);
        assert_eq!(v.valence(), Valence::Mixed);

        let v = EmotionVector::from_scores([(Emotion::Shame, 0.8)]);
        assert_eq!(v.valence(), Valence::Negative);
    }

    #[test]
    fn test_emotion_vector_clamps_on_construction() {
        let v = EmotionVector::from_scores([(Emotion::Love, 1.7), (Emotion::Fear, -0.3)]);
        assert_eq!(v.get(Emotion::Love), 1.0);
        assert_eq!(v.get(Emotion::Fear), 0.0);
    }

    #[test]
    fn test_emotion_vector_serializes_with_axis_names() {
        let v = EmotionVector::from_scores([(Emotion::Curiosity, 0.5)]);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({ "curiosity": 0.5 }));

        let back: EmotionVector = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_emotion_mean_skips_empty_vectors() {
        let a = EmotionVector::from_scores([(Emotion::Joy, 0.8)]);
        let b = EmotionVector::from_scores([(Emotion::Joy, 0.4), (Emotion::Fear, 0.2)]);
        let empty = EmotionVector::new();

        let mean = EmotionVector::mean([&a, &b, &empty]);
        assert!((mean.get(Emotion::Joy) - 0.6).abs() < 1e-12);
        assert!((mean.get(Emotion::Fear) - 0.1).abs() < 1e-12);
    }
}
