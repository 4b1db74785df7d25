// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Error taxonomy for the cortex engine

use thiserror::Error;

use super::graph::NodeId;
use super::llm::LLMError;
use super::vector::SchemaVersion;

/// Errors raised by the graph/storage collaborator
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Engine-level errors surfaced to callers of the cortex
#[derive(Debug, Error)]
pub enum CortexError {
    /// Model output was malformed or unavailable. Callers recover locally by
    /// substituting an empty vector.
    #[error("Vector extraction failed: {0}")]
    VectorExtraction(String),

    /// Fusion was attempted over vectors scored against different schema versions
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        expected: SchemaVersion,
        found: SchemaVersion,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("Language model error: {0}")]
    LanguageModel(#[from] LLMError),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type CortexResult<T> = Result<T, CortexError>;
