// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vector Scorer
//!
//! Turns a model's raw numeric guess into a validated vector. Value vectors are
//! scored against the current schema: unknown axes are dropped, values are
//! clamped to `[0, 1]` and missing axes are left absent. Emotion vectors follow
//! the same contract over the fixed emotion set.
//!
//! Scoring is idempotent: feeding a scored vector back in returns it unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{CortexError, CortexResult};
use crate::domain::llm::LanguageModelGateway;
use crate::domain::value::ValueSchema;
use crate::domain::vector::{clamp_unit, Emotion, EmotionVector, ValueVector};

use super::prompts;

/// Axis name to raw model estimate, before validation
pub type RawScores = BTreeMap<String, f64>;

pub fn score_value_vector(raw: &RawScores, schema: &ValueSchema) -> ValueVector {
    let scores = raw.iter().filter_map(|(name, value)| {
        schema
            .canonical_name(name)
            .map(|canonical| (canonical.to_string(), clamp_unit(*value)))
    });
    ValueVector::with_scores(schema.version, scores)
}

pub fn score_emotion_vector(raw: &RawScores) -> EmotionVector {
    EmotionVector::from_scores(
        raw.iter()
            .filter_map(|(name, value)| Emotion::parse(name).map(|emotion| (emotion, *value))),
    )
}

/// Pull a JSON object out of model output that may be wrapped in a markdown
/// code block or surrounded by prose
pub fn extract_json(text: &str) -> Option<String> {
    let start_marker = "```json";
    if let Some(start) = text.find(start_marker) {
        let content_start = start + start_marker.len();
        if let Some(end_offset) = text[content_start..].find("```") {
            return Some(text[content_start..content_start + end_offset].trim().to_string());
        }
    }

    let generic_marker = "```";
    if let Some(start) = text.find(generic_marker) {
        let content_start = start + generic_marker.len();
        if let Some(end_offset) = text[content_start..].find("```") {
            return Some(text[content_start..content_start + end_offset].trim().to_string());
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(text[start..=end].to_string()),
        _ => None,
    }
}

/// Parse model output into a JSON value, tolerating fences and prose
pub fn parse_model_json(text: &str) -> CortexResult<serde_json::Value> {
    let json = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str(&json).map_err(|e| {
        CortexError::VectorExtraction(format!("model output is not valid JSON: {}", e))
    })
}

/// Numeric entries of a JSON object. Non-numeric and non-finite values are
/// dropped.
pub fn raw_scores_from_json(value: &serde_json::Value) -> CortexResult<RawScores> {
    let object = value.as_object().ok_or_else(|| {
        CortexError::VectorExtraction("expected a JSON object of axis scores".into())
    })?;

    Ok(object
        .iter()
        .filter_map(|(name, value)| {
            let number = match value {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }?;
            number.is_finite().then(|| (name.clone(), number))
        })
        .collect())
}

pub fn parse_raw_scores(text: &str) -> CortexResult<RawScores> {
    raw_scores_from_json(&parse_model_json(text)?)
}

/// Gateway-backed extraction of value and emotion vectors
pub struct VectorScorer {
    gateway: Arc<dyn LanguageModelGateway>,
    model: String,
    embedding_model: String,
}

impl VectorScorer {
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            gateway,
            embedding_model: model.clone(),
            model,
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub async fn extract_value_vector(&self, text: &str, schema: &ValueSchema) -> CortexResult<ValueVector> {
        let prompt = prompts::value_vector_prompt(text, schema);
        let output = self.complete(&prompt).await?;
        let raw = parse_raw_scores(&output)?;
        let vector = score_value_vector(&raw, schema);
        debug!(axes = vector.len(), version = %schema.version, "Value vector extracted");
        Ok(vector)
    }

    pub async fn extract_emotion_vector(&self, text: &str) -> CortexResult<EmotionVector> {
        let prompt = prompts::emotion_vector_prompt(text);
        let output = self.complete(&prompt).await?;
        let raw = parse_raw_scores(&output)?;
        Ok(score_emotion_vector(&raw))
    }

    /// Extraction that never blocks the pipeline: failures become an empty
    /// vector tagged with the current schema version
    pub async fn value_vector_or_empty(&self, text: &str, schema: &ValueSchema) -> ValueVector {
        match self.extract_value_vector(text, schema).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Value vector extraction failed, using empty vector");
                ValueVector::new(schema.version)
            }
        }
    }

    pub async fn emotion_vector_or_empty(&self, text: &str) -> EmotionVector {
        match self.extract_emotion_vector(text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Emotion vector extraction failed, using empty vector");
                EmotionVector::new()
            }
        }
    }

    pub async fn embed(&self, text: &str) -> CortexResult<Vec<f32>> {
        Ok(self.gateway.embed(&self.embedding_model, text).await?)
    }

    async fn complete(&self, prompt: &str) -> CortexResult<String> {
        self.gateway
            .complete(&self.model, prompt)
            .await
            .map_err(|e| CortexError::VectorExtraction(format!("gateway call failed: {}", e)))
    }
}
