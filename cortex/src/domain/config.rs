// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Engine Configuration
//!
//! YAML configuration for the cortex engine. Every field defaults to the
//! engine's reference constants, so an empty document is a valid config.
//!
//! Discovery order:
//! 1. explicit path (CLI `--config`)
//! 2. `ECODIA_CONFIG_PATH`
//! 3. `./ecodia-config.yaml`
//! 4. `~/.ecodia/config.yaml`
//! 5. `/etc/ecodia/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub mesh: MeshConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Divergence above which responses go to peer review
    #[serde(default = "default_conflict_threshold")]
    pub conflict_threshold: f64,
    /// Fused axis score above which the axis importance is bumped
    #[serde(default = "default_bump_threshold")]
    pub importance_bump_threshold: f64,
    #[serde(default = "default_bump_amount")]
    pub importance_bump_amount: f64,
    #[serde(default = "default_importance_cap")]
    pub importance_cap: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            conflict_threshold: default_conflict_threshold(),
            importance_bump_threshold: default_bump_threshold(),
            importance_bump_amount: default_bump_amount(),
            importance_cap: default_importance_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Fraction of importance lost per maintenance cycle
    #[serde(default = "default_importance_decay_rate")]
    pub importance_decay_rate: f64,
    #[serde(default = "default_importance_floor")]
    pub importance_floor: f64,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            importance_decay_rate: default_importance_decay_rate(),
            importance_floor: default_importance_floor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_base_decay_rate")]
    pub base_decay_rate: f64,
    #[serde(default = "default_decay_rate_floor")]
    pub decay_rate_floor: f64,
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f64,
    #[serde(default = "default_promotion_base")]
    pub promotion_base: f64,
    /// Threshold reduction per unit of agent priority
    #[serde(default = "default_priority_discount")]
    pub priority_discount: f64,
    #[serde(default = "default_min_surface_score")]
    pub min_surface_score: f64,
    #[serde(default = "default_resurface_limit")]
    pub resurface_limit: usize,
    #[serde(default = "default_true")]
    pub emotion_tagging: bool,
    /// Store an embedding of the raw text when an event is ingested
    #[serde(default)]
    pub embed_on_ingest: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_decay_rate: default_base_decay_rate(),
            decay_rate_floor: default_decay_rate_floor(),
            prune_threshold: default_prune_threshold(),
            promotion_base: default_promotion_base(),
            priority_discount: default_priority_discount(),
            min_surface_score: default_min_surface_score(),
            resurface_limit: default_resurface_limit(),
            emotion_tagging: true,
            embed_on_ingest: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Fused axis score above which the event is linked to the value node
    #[serde(default = "default_value_link_threshold")]
    pub value_link_threshold: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            value_link_threshold: default_value_link_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub providers: Vec<LLMProviderConfig>,
    /// Alias used by the vector scorer
    #[serde(default = "default_model_alias")]
    pub scoring_model: String,
    /// Alias used for embeddings
    #[serde(default = "default_model_alias")]
    pub embedding_model: String,
    /// Retries per call, 0 or 1
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            scoring_model: default_model_alias(),
            embedding_model: default_model_alias(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    pub name: String,
    /// "openai", "openai-compatible" or "ollama"
    #[serde(rename = "type")]
    pub provider_type: String,
    pub endpoint: String,
    /// Literal key or "env:VAR_NAME"
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub models: Vec<ModelConfig>,
    /// Model used for embeddings, when different from the chat model
    #[serde(default)]
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub alias: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default = "default_agent_role")]
    pub role: String,
    #[serde(default)]
    pub description: String,
    /// Voice the agent is prompted with
    #[serde(default)]
    pub persona: String,
    #[serde(default = "default_model_alias")]
    pub model: String,
    #[serde(default)]
    pub priority: f64,
}

fn default_conflict_threshold() -> f64 {
    0.5
}

fn default_bump_threshold() -> f64 {
    0.65
}

fn default_bump_amount() -> f64 {
    0.05
}

fn default_importance_cap() -> f64 {
    1.0
}

fn default_importance_decay_rate() -> f64 {
    0.01
}

fn default_importance_floor() -> f64 {
    0.05
}

fn default_base_decay_rate() -> f64 {
    0.03
}

fn default_decay_rate_floor() -> f64 {
    0.0001
}

fn default_prune_threshold() -> f64 {
    0.12
}

fn default_promotion_base() -> f64 {
    0.85
}

fn default_priority_discount() -> f64 {
    0.04
}

fn default_min_surface_score() -> f64 {
    0.55
}

fn default_resurface_limit() -> usize {
    100
}

fn default_top_k() -> usize {
    8
}

fn default_value_link_threshold() -> f64 {
    0.75
}

fn default_interval_seconds() -> u64 {
    3600
}

fn default_model_alias() -> String {
    "default".to_string()
}

fn default_agent_role() -> String {
    "reasoner".to_string()
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ECODIA_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./ecodia-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".ecodia").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/ecodia/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ECODIA_MAINTENANCE_ENABLED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: ECODIA_MAINTENANCE_ENABLED=true");
                    self.maintenance.enabled = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: ECODIA_MAINTENANCE_ENABLED=false");
                    self.maintenance.enabled = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for ECODIA_MAINTENANCE_ENABLED: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("ECODIA_CONFLICT_THRESHOLD") {
            match val.parse::<f64>() {
                Ok(threshold) => {
                    tracing::info!("Environment override: ECODIA_CONFLICT_THRESHOLD={}", threshold);
                    self.consensus.conflict_threshold = threshold;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for ECODIA_CONFLICT_THRESHOLD: '{}'. Expected a number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let unit_fields = [
            ("consensus.conflict_threshold", self.consensus.conflict_threshold),
            ("consensus.importance_bump_threshold", self.consensus.importance_bump_threshold),
            ("consensus.importance_bump_amount", self.consensus.importance_bump_amount),
            ("consensus.importance_cap", self.consensus.importance_cap),
            ("schema.importance_decay_rate", self.schema.importance_decay_rate),
            ("schema.importance_floor", self.schema.importance_floor),
            ("memory.prune_threshold", self.memory.prune_threshold),
            ("memory.promotion_base", self.memory.promotion_base),
            ("memory.priority_discount", self.memory.priority_discount),
            ("memory.min_surface_score", self.memory.min_surface_score),
            ("mesh.value_link_threshold", self.mesh.value_link_threshold),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, value);
            }
        }

        if self.schema.importance_floor <= 0.0 {
            anyhow::bail!("schema.importance_floor must be greater than 0");
        }
        if self.schema.importance_floor > self.consensus.importance_cap {
            anyhow::bail!(
                "schema.importance_floor ({}) cannot exceed consensus.importance_cap ({})",
                self.schema.importance_floor,
                self.consensus.importance_cap
            );
        }
        if self.memory.base_decay_rate < 0.0 || self.memory.decay_rate_floor < 0.0 {
            anyhow::bail!("memory decay rates cannot be negative");
        }
        if self.mesh.top_k == 0 {
            anyhow::bail!("mesh.top_k must be at least 1");
        }
        if self.maintenance.interval_seconds == 0 {
            anyhow::bail!("maintenance.interval_seconds must be at least 1");
        }
        if self.llm.max_retries > 1 {
            anyhow::bail!(
                "llm.max_retries must be 0 or 1, got {}",
                self.llm.max_retries
            );
        }

        for provider in &self.llm.providers {
            if provider.name.is_empty() {
                anyhow::bail!("LLM provider name cannot be empty");
            }
            if provider.endpoint.is_empty() {
                anyhow::bail!("LLM provider endpoint cannot be empty for: {}", provider.name);
            }
            if provider.models.is_empty() {
                anyhow::bail!("LLM provider must have at least one model: {}", provider.name);
            }
            for model in &provider.models {
                if model.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in provider: {}", provider.name);
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for agent in &self.agents {
            if agent.name.is_empty() {
                anyhow::bail!("Agent name cannot be empty");
            }
            if !seen.insert(agent.name.as_str()) {
                anyhow::bail!("Duplicate agent name: {}", agent.name);
            }
            if !(0.0..=1.0).contains(&agent.priority) {
                anyhow::bail!("Agent '{}' priority must be within [0, 1]", agent.name);
            }
            if !self.llm.providers.is_empty() && !self.has_alias(&agent.model) {
                anyhow::bail!(
                    "Agent '{}' uses model alias '{}' which no provider declares",
                    agent.name,
                    agent.model
                );
            }
        }

        Ok(())
    }

    fn has_alias(&self, alias: &str) -> bool {
        self.llm
            .providers
            .iter()
            .flat_map(|p| p.models.iter())
            .any(|m| m.alias == alias)
    }
}
