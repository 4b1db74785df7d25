// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_mesh;
pub mod conflict_detector;
pub mod consensus_builder;
pub mod llm_agent;
pub mod maintenance;
pub mod memory_lifecycle;
pub mod mesh_synthesizer;
pub mod peer_review;
pub mod pipeline;
pub mod prompts;
pub mod value_schema;
pub mod vector_scorer;

pub use agent_mesh::{ensure_agent_node, AgentContext, AgentMesh, AgentRegistry, ReasoningAgent};
pub use conflict_detector::{ConflictDetector, MeshDivergence};
pub use consensus_builder::ConsensusBuilder;
pub use llm_agent::LlmAgent;
pub use maintenance::{CycleReport, MaintenanceTask};
pub use memory_lifecycle::{DecayReport, EvaluationResult, MemoryLifecycleManager};
pub use mesh_synthesizer::{MeshEdge, MeshReport, MeshSynthesizer};
pub use peer_review::{PeerReviewEscalator, ReviewOutcome};
pub use pipeline::{CognitivePipeline, PipelineDeps, PipelineOutcome, PipelineStatus, ProcessOutcome};
pub use value_schema::ValueSchemaRegistry;
pub use vector_scorer::VectorScorer;
