// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Value schema: the versioned pool of value axes every vector is scored against

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::graph::{GraphNode, NodeId};
use super::errors::RepositoryError;
use super::vector::{clamp_unit, SchemaVersion};

/// A named dimension the system scores text against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAxis {
    #[serde(default)]
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub importance: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

fn default_active() -> bool {
    true
}

impl ValueAxis {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        importance: f64,
        created_by: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: NodeId::new(),
            label: name.clone(),
            name,
            description: description.into(),
            importance: clamp_unit(importance),
            active: true,
            created_at: Utc::now(),
            created_by: created_by.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn set_importance(&mut self, importance: f64) {
        self.importance = clamp_unit(importance);
    }

    /// Rebuild an axis from its storage node; the node id is authoritative
    pub fn from_node(node: &GraphNode) -> Result<Self, RepositoryError> {
        let mut axis: ValueAxis = node.decode()?;
        axis.id = node.id;
        Ok(axis)
    }
}

/// Snapshot of the value-axis pool at one version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueSchema {
    pub version: SchemaVersion,
    pub axes: Vec<ValueAxis>,
}

impl ValueSchema {
    pub fn active_axes(&self) -> impl Iterator<Item = &ValueAxis> {
        self.axes.iter().filter(|axis| axis.active)
    }

    /// Active axis by exact name
    pub fn axis(&self, name: &str) -> Option<&ValueAxis> {
        self.active_axes().find(|axis| axis.name == name)
    }

    /// Canonical name of an active axis, matching case-insensitively
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.axis(name)
            .or_else(|| {
                self.active_axes()
                    .find(|axis| axis.name.eq_ignore_ascii_case(name))
            })
            .map(|axis| axis.name.as_str())
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.axis(name).is_some()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.active_axes().map(|axis| axis.name.clone()).collect()
    }
}

/// Mutation recorded in the schema audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaAction {
    AddAxis,
    RemoveAxis,
    EditAxis,
    SetImportance,
    DecayImportance,
    BumpImportance,
    ResetBlankSlate,
}

impl fmt::Display for SchemaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaAction::AddAxis => "add_axis",
            SchemaAction::RemoveAxis => "remove_axis",
            SchemaAction::EditAxis => "edit_axis",
            SchemaAction::SetImportance => "set_importance",
            SchemaAction::DecayImportance => "decay_importance",
            SchemaAction::BumpImportance => "bump_importance",
            SchemaAction::ResetBlankSlate => "reset_blank_slate",
        };
        f.write_str(name)
    }
}

/// One entry in the schema audit trail. `sequence` equals the schema version
/// produced by the mutation, so the trail is totally ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAuditRecord {
    pub sequence: u64,
    pub actor: String,
    pub action: SchemaAction,
    pub note: String,
    pub old_pool: Vec<ValueAxis>,
    pub new_pool: Vec<ValueAxis>,
    pub timestamp: DateTime<Utc>,
}

/// Partial update for [`crate::application::ValueSchemaRegistry::edit_axis`]
#[derive(Debug, Clone, Default)]
pub struct AxisEdit {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl AxisEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.label.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ValueSchema {
        let mut retired = ValueAxis::new("loyalty", "", 0.5, "test");
        retired.active = false;
        ValueSchema {
            version: SchemaVersion(4),
            axes: vec![
                ValueAxis::new("empathy", "Care for others", 0.9, "test"),
                ValueAxis::new("courage", "Acting despite fear", 0.6, "test"),
                retired,
            ],
        }
    }

    #[test]
    fn test_importance_is_clamped() {
        let mut axis = ValueAxis::new("empathy", "", 1.4, "test");
        assert_eq!(axis.importance, 1.0);
        axis.set_importance(-0.2);
        assert_eq!(axis.importance, 0.0);
    }

    #[test]
    fn test_inactive_axes_are_unknown() {
        let schema = schema();
        assert!(schema.is_known("empathy"));
        assert!(!schema.is_known("loyalty"));
        assert_eq!(schema.active_names(), vec!["empathy", "courage"]);
    }

    #[test]
    fn test_canonical_name_matches_case_insensitively() {
        let schema = schema();
        assert_eq!(schema.canonical_name("Empathy"), Some("empathy"));
        assert_eq!(schema.canonical_name("LOYALTY"), None);
    }
}
