// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Language-model backed reasoning agent: a persona and a model alias bound to
// the gateway. Different "agents" are just different bindings.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::agent::{ActionPlan, AgentDescriptor, AgentResponse, CritiqueReply};
use crate::domain::config::AgentConfig;
use crate::domain::errors::CortexResult;
use crate::domain::llm::{LLMError, LanguageModelGateway};
use crate::domain::memory::MemoryRecord;
use crate::domain::vector::{EmotionVector, ValueVector};

use super::agent_mesh::{AgentContext, ReasoningAgent};
use super::prompts;
use super::vector_scorer::{parse_model_json, raw_scores_from_json, score_emotion_vector, score_value_vector};

/// Shape an agent is asked to answer with. Everything but the rationale is
/// optional so a partially useful answer still counts.
#[derive(Debug, Deserialize)]
struct RawAgentOutput {
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    value_vector: Value,
    #[serde(default)]
    emotion_vector: Value,
    #[serde(default)]
    action_plan: Option<ActionPlan>,
}

pub struct LlmAgent {
    descriptor: AgentDescriptor,
    persona: String,
    gateway: Arc<dyn LanguageModelGateway>,
}

impl LlmAgent {
    pub fn new(
        descriptor: AgentDescriptor,
        persona: impl Into<String>,
        gateway: Arc<dyn LanguageModelGateway>,
    ) -> Self {
        Self {
            descriptor,
            persona: persona.into(),
            gateway,
        }
    }

    pub fn from_config(config: &AgentConfig, gateway: Arc<dyn LanguageModelGateway>) -> Self {
        let descriptor = AgentDescriptor::new(config.name.clone(), config.role.clone())
            .with_description(config.description.clone())
            .with_model(config.model.clone())
            .with_priority(config.priority);
        let persona = if config.persona.is_empty() {
            format!("You are {}, a {} agent in a shared memory system.", config.name, config.role)
        } else {
            config.persona.clone()
        };
        Self::new(descriptor, persona, gateway)
    }

    fn model(&self) -> &str {
        self.descriptor.model.as_deref().unwrap_or("default")
    }

    async fn ask(&self, prompt: &str) -> CortexResult<Value> {
        let text = self.gateway.complete(self.model(), prompt).await?;
        parse_model_json(&text).map_err(|e| {
            LLMError::MalformedOutput(format!("{} returned unusable output: {}", self.descriptor.name, e)).into()
        })
    }
}

#[async_trait]
impl ReasoningAgent for LlmAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn produce(&self, event: &MemoryRecord, context: &AgentContext) -> CortexResult<AgentResponse> {
        let prompt = prompts::agent_processing_prompt(&self.persona, event, &context.schema);
        let output: RawAgentOutput = serde_json::from_value(self.ask(&prompt).await?)
            .map_err(|e| LLMError::MalformedOutput(e.to_string()))?;

        // a bad vector degrades to empty rather than failing the agent
        let value_vector = match raw_scores_from_json(&output.value_vector) {
            Ok(raw) => score_value_vector(&raw, &context.schema),
            Err(e) => {
                warn!(agent = %self.descriptor.name, error = %e, "Unusable value vector in agent output");
                ValueVector::new(context.schema.version)
            }
        };
        let emotion_vector = match raw_scores_from_json(&output.emotion_vector) {
            Ok(raw) => score_emotion_vector(&raw),
            Err(_) => EmotionVector::new(),
        };

        let mut response = AgentResponse::new(
            self.descriptor.name.clone(),
            output.rationale,
            output.score.unwrap_or(0.5),
            value_vector,
            emotion_vector,
        )
        .with_priority(self.descriptor.priority);
        response.action_plan = output.action_plan;

        debug!(agent = %self.descriptor.name, score = response.score, "Agent produced a response");
        Ok(response)
    }

    async fn review(
        &self,
        event: &MemoryRecord,
        own: &AgentResponse,
        peers: &[AgentResponse],
    ) -> CortexResult<CritiqueReply> {
        let peer_refs: Vec<&AgentResponse> = peers.iter().collect();
        let prompt = prompts::peer_review_prompt(&self.persona, event, own, &peer_refs);
        let reply: CritiqueReply = serde_json::from_value(self.ask(&prompt).await?)
            .map_err(|e| LLMError::MalformedOutput(e.to_string()))?;
        debug!(agent = %self.descriptor.name, shifted = reply.shifted, "Agent reviewed peers");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CortexError;
    use crate::domain::value::{ValueAxis, ValueSchema};
    use crate::domain::vector::{Emotion, SchemaVersion};
    use parking_lot::Mutex;

    /// Replies with canned outputs in order and records the prompts it saw
    struct ScriptedGateway {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGateway {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModelGateway for ScriptedGateway {
        async fn complete(&self, model: &str, prompt: &str) -> Result<String, LLMError> {
            self.prompts.lock().push((model.to_string(), prompt.to_string()));
            self.replies
                .lock()
                .pop()
                .ok_or_else(|| LLMError::Provider("script exhausted".into()))
        }

        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>, LLMError> {
            Ok(Vec::new())
        }
    }

    fn context() -> AgentContext {
        AgentContext {
            schema: ValueSchema {
                version: SchemaVersion(2),
                axes: vec![ValueAxis::new("empathy", "Care for others", 0.9, "test")],
            },
        }
    }

    fn agent(gateway: Arc<ScriptedGateway>) -> LlmAgent {
        LlmAgent::new(
            AgentDescriptor::new("alpha", "reasoner")
                .with_model("fast")
                .with_priority(0.8),
            "You are alpha.",
            gateway,
        )
    }

    fn earlier_response() -> AgentResponse {
        AgentResponse::new(
            "alpha",
            "generous",
            0.7,
            ValueVector::new(SchemaVersion(2)),
            EmotionVector::new(),
        )
    }

    fn event() -> MemoryRecord {
        MemoryRecord {
            raw_text: "a neighbour shared their harvest".into(),
            ..MemoryRecord::default()
        }
    }

    #[tokio::test]
    async fn test_produce_scores_vectors_against_schema() {
        let gateway = ScriptedGateway::new(&[r#"```json
{"rationale": "generosity", "score": 0.8,
 "value_vector": {"Empathy": 1.4, "greed": 0.2},
 "emotion_vector": {"joy": 0.7, "boredom": 0.5},
 "action_plan": {"action_type": "email", "details": {"to": "community"}}}
```"#]);
        let response = agent(gateway.clone()).produce(&event(), &context()).await.unwrap();

        assert_eq!(response.rationale, "generosity");
        assert_eq!(response.value_vector.schema_version, SchemaVersion(2));
        assert_eq!(response.value_vector.get("empathy"), 1.0);
        assert!(!response.value_vector.contains("greed"));
        assert_eq!(response.emotion_vector.get(Emotion::Joy), 0.7);
        assert_eq!(response.agent_priority, 0.8);
        assert_eq!(response.action_plan.unwrap().action_type, "email");

        let prompts = gateway.prompts.lock();
        assert_eq!(prompts[0].0, "fast");
        assert!(prompts[0].1.contains("You are alpha."));
    }

    #[tokio::test]
    async fn test_malformed_vector_degrades_to_empty() {
        let gateway = ScriptedGateway::new(&[r#"{"rationale": "hm", "value_vector": "lots"}"#]);
        let response = agent(gateway).produce(&event(), &context()).await.unwrap();
        assert!(response.value_vector.is_empty());
        assert_eq!(response.score, 0.5);
    }

    #[tokio::test]
    async fn test_prose_output_is_a_model_error() {
        let gateway = ScriptedGateway::new(&["I would rather not."]);
        let err = agent(gateway).produce(&event(), &context()).await.unwrap_err();
        assert!(matches!(err, CortexError::LanguageModel(LLMError::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn test_review_parses_critique_reply() {
        let gateway = ScriptedGateway::new(&[r#"{"revised_rationale": "still generous", "shifted": false}"#]);
        let agent = agent(gateway);
        let own = earlier_response();
        let reply = agent.review(&event(), &own, &[]).await.unwrap();
        assert!(!reply.shifted);
        assert_eq!(reply.revised_rationale, "still generous");
    }

    #[tokio::test]
    async fn test_missing_shifted_flag_counts_as_shift() {
        let gateway = ScriptedGateway::new(&[r#"{"revised_rationale": "unsure"}"#]);
        let agent = agent(gateway);
        let own = earlier_response();
        assert!(agent.review(&event(), &own, &[]).await.unwrap().shifted);
    }
}
