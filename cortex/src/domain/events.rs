// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the cortex bounded context
//! Every state transition in the engine is published for observability

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::NodeId;
use super::review::ReviewStatus;
use super::value::SchemaAction;
use super::vector::SchemaVersion;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexEvent {
    // Value schema

    SchemaChanged {
        version: SchemaVersion,
        action: SchemaAction,
        actor: String,
        timestamp: DateTime<Utc>,
    },

    // Agent mesh and consensus

    /// An agent raised; an error-flagged response was recorded instead
    AgentFailed {
        agent_name: String,
        event_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },

    ConflictDetected {
        event_id: NodeId,
        triggers: Vec<String>,
        conflict_axes: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    ConsensusReached {
        event_id: Option<NodeId>,
        consensus_id: NodeId,
        consensus_score: f64,
        agent_count: usize,
        timestamp: DateTime<Utc>,
    },

    PeerReviewCompleted {
        event_id: NodeId,
        peer_review_id: NodeId,
        status: ReviewStatus,
        timestamp: DateTime<Utc>,
    },

    /// Review did not converge; an open conflict awaits external resolution
    ConflictEscalated {
        event_id: NodeId,
        conflict_id: NodeId,
        edge_type: String,
        timestamp: DateTime<Utc>,
    },

    // Memory lifecycle

    MemoryEvaluated {
        memory_id: NodeId,
        score: f64,
        threshold: f64,
        timestamp: DateTime<Utc>,
    },

    MemoryPromoted {
        memory_id: NodeId,
        core_memory_id: NodeId,
        score: f64,
        timestamp: DateTime<Utc>,
    },

    MemoryDecayed {
        memory_id: NodeId,
        old_score: f64,
        new_score: f64,
        decay_rate: f64,
        timestamp: DateTime<Utc>,
    },

    BranchArchived {
        root_id: NodeId,
        archived_count: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    BranchRestored {
        root_id: NodeId,
        restored_count: usize,
        timestamp: DateTime<Utc>,
    },

    MemoryResurfaced {
        memory_id: NodeId,
        trigger: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Mesh

    MeshLinked {
        event_id: NodeId,
        edges_created: usize,
        timestamp: DateTime<Utc>,
    },

    MaintenanceCycleCompleted {
        decayed: usize,
        archived: usize,
        resurfaced: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CortexEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CortexEvent::SchemaChanged { timestamp, .. }
            | CortexEvent::AgentFailed { timestamp, .. }
            | CortexEvent::ConflictDetected { timestamp, .. }
            | CortexEvent::ConsensusReached { timestamp, .. }
            | CortexEvent::PeerReviewCompleted { timestamp, .. }
            | CortexEvent::ConflictEscalated { timestamp, .. }
            | CortexEvent::MemoryEvaluated { timestamp, .. }
            | CortexEvent::MemoryPromoted { timestamp, .. }
            | CortexEvent::MemoryDecayed { timestamp, .. }
            | CortexEvent::BranchArchived { timestamp, .. }
            | CortexEvent::BranchRestored { timestamp, .. }
            | CortexEvent::MemoryResurfaced { timestamp, .. }
            | CortexEvent::MeshLinked { timestamp, .. }
            | CortexEvent::MaintenanceCycleCompleted { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            CortexEvent::SchemaChanged { .. } => "SchemaChanged",
            CortexEvent::AgentFailed { .. } => "AgentFailed",
            CortexEvent::ConflictDetected { .. } => "ConflictDetected",
            CortexEvent::ConsensusReached { .. } => "ConsensusReached",
            CortexEvent::PeerReviewCompleted { .. } => "PeerReviewCompleted",
            CortexEvent::ConflictEscalated { .. } => "ConflictEscalated",
            CortexEvent::MemoryEvaluated { .. } => "MemoryEvaluated",
            CortexEvent::MemoryPromoted { .. } => "MemoryPromoted",
            CortexEvent::MemoryDecayed { .. } => "MemoryDecayed",
            CortexEvent::BranchArchived { .. } => "BranchArchived",
            CortexEvent::BranchRestored { .. } => "BranchRestored",
            CortexEvent::MemoryResurfaced { .. } => "MemoryResurfaced",
            CortexEvent::MeshLinked { .. } => "MeshLinked",
            CortexEvent::MaintenanceCycleCompleted { .. } => "MaintenanceCycleCompleted",
        }
    }
}

/// Sink for cortex domain events. Publishing never fails; an event nobody
/// listens to is dropped.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: CortexEvent);
}
