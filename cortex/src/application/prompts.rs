// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Prompt builders for agents and vector extraction. Every prompt asks for a
// single JSON object; parsing is tolerant of markdown fences around it.

use crate::domain::agent::AgentResponse;
use crate::domain::memory::MemoryRecord;
use crate::domain::value::ValueSchema;
use crate::domain::vector::Emotion;

/// Bumped whenever the wording of an extraction prompt changes
pub const EXTRACTION_PROMPT_VERSION: u32 = 1;

fn axis_lines(schema: &ValueSchema) -> String {
    let lines: Vec<String> = schema
        .active_axes()
        .map(|axis| {
            if axis.description.is_empty() {
                format!("- {}", axis.name)
            } else {
                format!("- {}: {}", axis.name, axis.description)
            }
        })
        .collect();
    if lines.is_empty() {
        "(no active values)".to_string()
    } else {
        lines.join("\n")
    }
}

fn emotion_names() -> String {
    Emotion::ALL
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn value_vector_prompt(text: &str, schema: &ValueSchema) -> String {
    let example = schema
        .active_axes()
        .next()
        .map(|axis| axis.name.as_str())
        .unwrap_or("compassion");
    format!(
        "[Value Vector Extraction v{}.{}]\n\
         System values:\n{}\n\n\
         Score the input from 0 to 1 for each value. 0 = not expressed, 1 = strongly expressed.\n\
         Respond with a single JSON object and nothing else.\n\n\
         Input: \"{}\"\n\
         Output JSON: {{\"{}\": 0.5, ...}}\n",
        EXTRACTION_PROMPT_VERSION,
        schema.version.0,
        axis_lines(schema),
        text,
        example
    )
}

pub fn emotion_vector_prompt(text: &str) -> String {
    format!(
        "[Emotion Vector Extraction v{}]\n\
         Emotions: {}\n\n\
         Score how strongly the input expresses each emotion, from 0 to 1.\n\
         Respond with a single JSON object and nothing else.\n\n\
         Input: \"{}\"\n\
         Output JSON: {{\"joy\": 0.1, ...}}\n",
        EXTRACTION_PROMPT_VERSION,
        emotion_names(),
        text
    )
}

/// First-pass reading of an event by one agent
pub fn agent_processing_prompt(persona: &str, event: &MemoryRecord, schema: &ValueSchema) -> String {
    let topics = if event.topics.is_empty() {
        "none".to_string()
    } else {
        event.topics.join(", ")
    };
    format!(
        "{}\n\n\
         Event: \"{}\"\n\
         Topics: {}\n\n\
         System values:\n{}\n\
         Emotions: {}\n\n\
         Reflect on what this event means. Respond with a single JSON object:\n\
         {{\n  \"rationale\": \"<your reasoning>\",\n  \"score\": <0..1 how significant the event is>,\n  \
         \"value_vector\": {{\"<value>\": <0..1>, ...}},\n  \"emotion_vector\": {{\"<emotion>\": <0..1>, ...}},\n  \
         \"action_plan\": null | {{\"action_type\": \"<type>\", \"details\": {{}}}}\n}}\n",
        persona,
        event.raw_text,
        topics,
        axis_lines(schema),
        emotion_names()
    )
}

/// Critique round: the agent sees its own response and every peer's in full
pub fn peer_review_prompt(
    persona: &str,
    event: &MemoryRecord,
    own: &AgentResponse,
    peers: &[&AgentResponse],
) -> String {
    let render = |response: &AgentResponse| {
        serde_json::to_string_pretty(response).unwrap_or_else(|_| response.rationale.clone())
    };
    let peer_blocks: Vec<String> = peers
        .iter()
        .map(|peer| format!("[{}]\n{}", peer.agent_name, render(peer)))
        .collect();

    format!(
        "{}\n\n\
         Event: \"{}\"\n\n\
         Your earlier response:\n{}\n\n\
         Responses from the other agents:\n{}\n\n\
         Critique the other responses and reconsider your own. Respond with a single JSON object:\n\
         {{\n  \"revised_rationale\": \"<reasoning after review>\",\n  \
         \"value_vector_diff\": {{\"<value>\": <change>, ...}},\n  \
         \"emotion_vector_diff\": {{\"<emotion>\": <change>, ...}},\n  \
         \"shifted\": <true if your position changed, false if you hold it>\n}}\n",
        persona,
        event.raw_text,
        render(own),
        peer_blocks.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::ValueAxis;
    use crate::domain::vector::{EmotionVector, SchemaVersion, ValueVector};

    fn schema() -> ValueSchema {
        ValueSchema {
            version: SchemaVersion(7),
            axes: vec![
                ValueAxis::new("empathy", "Care for others", 0.9, "test"),
                ValueAxis::new("courage", "", 0.5, "test"),
            ],
        }
    }

    #[test]
    fn test_value_prompt_lists_active_axes_and_version() {
        let prompt = value_vector_prompt("I helped a stranger", &schema());
        assert!(prompt.contains("v1.7"));
        assert!(prompt.contains("- empathy: Care for others"));
        assert!(prompt.contains("- courage\n"));
        assert!(prompt.contains("I helped a stranger"));
    }

    #[test]
    fn test_emotion_prompt_names_every_emotion() {
        let prompt = emotion_vector_prompt("text");
        for emotion in Emotion::ALL {
            assert!(prompt.contains(emotion.as_str()));
        }
    }

    #[test]
    fn test_review_prompt_includes_peers_in_full() {
        let event = MemoryRecord {
            raw_text: "storm damaged the garden".into(),
            ..MemoryRecord::default()
        };
        let own = AgentResponse::new(
            "alpha",
            "a loss",
            0.4,
            ValueVector::new(SchemaVersion(1)),
            EmotionVector::new(),
        );
        let peer = AgentResponse::new(
            "beta",
            "a chance to rebuild",
            0.8,
            ValueVector::with_scores(SchemaVersion(1), [("resilience".to_string(), 0.9)]),
            EmotionVector::new(),
        );

        let prompt = peer_review_prompt("You are alpha.", &event, &own, &[&peer]);
        assert!(prompt.contains("[beta]"));
        assert!(prompt.contains("a chance to rebuild"));
        assert!(prompt.contains("resilience"));
        assert!(prompt.contains("\"shifted\""));
    }
}
