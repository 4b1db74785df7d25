// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Language Model Domain Interface (Anti-Corruption Layer)
//
// Two seams:
// - `LLMProvider` is implemented once per vendor API (infrastructure/llm/)
// - `LanguageModelGateway` is what the engine consumes: model aliases in,
//   text or embeddings out. Each agent persona resolves to its own alias.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Vendor adapter
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError>;

    /// Embed text into a dense vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LLMError>;

    /// Check if provider is healthy and accessible
    async fn health_check(&self) -> Result<(), LLMError>;
}

/// Engine-facing gateway. Failures always surface as errors, never as empty text.
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LLMError>;

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LLMError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(1024),
            // scoring wants stable numbers more than creative prose
            temperature: Some(0.2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    /// Provider type (e.g., "openai", "ollama")
    pub provider: String,
    pub model: String,
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
}

impl LLMError {
    /// Whether a single retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LLMError::Network(_) | LLMError::RateLimit | LLMError::Provider(_)
        )
    }
}
