// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Registry - Model Alias Resolution
//
// Resolves model aliases to provider adapters and implements the engine's
// language-model gateway. A failed call is retried at most once, after a
// fixed delay, and only for transient failures.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::config::{LLMProviderConfig, LlmConfig};
use crate::domain::llm::{GenerationOptions, LLMError, LLMProvider, LanguageModelGateway};

use super::ollama::OllamaAdapter;
use super::openai::OpenAIAdapter;

pub struct GatewayRegistry {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
    options: GenerationOptions,
    max_retries: u32,
    retry_delay: Duration,
}

impl GatewayRegistry {
    /// Empty registry. `max_retries` above 1 is clamped to 1.
    pub fn new(max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            providers: HashMap::new(),
            options: GenerationOptions::default(),
            max_retries: max_retries.min(1),
            retry_delay: Duration::from_millis(retry_delay_ms),
        }
    }

    /// Build one adapter per declared model alias
    pub fn from_config(config: &LlmConfig) -> anyhow::Result<Self> {
        let mut registry = Self::new(config.max_retries, config.retry_delay_ms);

        info!("Initializing language model gateway");

        for provider_config in &config.providers {
            if !provider_config.enabled {
                info!("Provider '{}' disabled, skipping", provider_config.name);
                continue;
            }

            let api_key = Self::resolve_api_key(&provider_config.api_key)?;
            for model_config in &provider_config.models {
                let provider =
                    Self::create_provider(provider_config, &model_config.model, &api_key)?;
                info!(
                    "Mapping alias '{}' -> {} ({})",
                    model_config.alias, model_config.model, provider_config.name
                );
                registry.register(model_config.alias.clone(), provider);
            }
        }

        if registry.providers.is_empty() {
            warn!("No language model providers configured - agents and scoring will fail");
        }

        Ok(registry)
    }

    pub fn register(&mut self, alias: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.providers.insert(alias.into(), provider);
    }

    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.providers.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    fn create_provider(
        config: &LLMProviderConfig,
        model: &str,
        api_key: &str,
    ) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let provider: Arc<dyn LLMProvider> = match config.provider_type.as_str() {
            "openai" | "openai-compatible" => {
                let mut adapter =
                    OpenAIAdapter::new(config.endpoint.clone(), api_key.to_string(), model.to_string());
                if let Some(embedding_model) = &config.embedding_model {
                    adapter = adapter.with_embedding_model(embedding_model.clone());
                }
                Arc::new(adapter)
            }
            "ollama" => {
                let mut adapter = OllamaAdapter::new(config.endpoint.clone(), model.to_string());
                if let Some(embedding_model) = &config.embedding_model {
                    adapter = adapter.with_embedding_model(embedding_model.clone());
                }
                Arc::new(adapter)
            }
            _ => anyhow::bail!("Unsupported provider type: {}", config.provider_type),
        };
        Ok(provider)
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key {
            Some(k) => match k.strip_prefix("env:") {
                Some(var_name) => std::env::var(var_name)
                    .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
                None => Ok(k.clone()),
            },
            None => Ok(String::new()),
        }
    }

    fn provider(&self, alias: &str) -> Result<&Arc<dyn LLMProvider>, LLMError> {
        self.providers
            .get(alias)
            .ok_or_else(|| LLMError::ModelNotFound(format!("Model alias '{}' not found", alias)))
    }

    /// Whether a failed attempt should be retried
    fn should_retry(&self, attempt: u32, error: &LLMError) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

#[async_trait]
impl LanguageModelGateway for GatewayRegistry {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LLMError> {
        let provider = self.provider(model)?;
        let mut attempt = 0;

        loop {
            match provider.generate(prompt, &self.options).await {
                Ok(response) => return Ok(response.text),
                Err(e) if self.should_retry(attempt, &e) => {
                    warn!(alias = model, error = %e, "Completion failed, retrying once");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LLMError> {
        let provider = self.provider(model)?;
        let mut attempt = 0;

        loop {
            match provider.embed(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if self.should_retry(attempt, &e) => {
                    warn!(alias = model, error = %e, "Embedding failed, retrying once");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
