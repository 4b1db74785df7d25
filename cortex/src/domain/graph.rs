// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Knowledge graph entities shared by the engine and its storage collaborator
//!
//! Complex property values (vectors, audit logs, critique lists) are stored
//! as JSON values inside [`Properties`]. [`GraphNode::decode`] and
//! [`to_properties`] translate between typed records and that representation.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::RepositoryError;

/// Property bag carried by nodes and edges
pub type Properties = serde_json::Map<String, Value>;

/// Node identifier in the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(NodeId)
    }
}

/// Edge identifier in the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage label of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    Event,
    CoreMemory,
    Value,
    ValueSchema,
    ValueSchemaAudit,
    Agent,
    Consensus,
    PeerReview,
    ConflictEvent,
    Emotion,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Event => "Event",
            NodeLabel::CoreMemory => "CoreMemory",
            NodeLabel::Value => "Value",
            NodeLabel::ValueSchema => "ValueSchema",
            NodeLabel::ValueSchemaAudit => "ValueSchemaAudit",
            NodeLabel::Agent => "Agent",
            NodeLabel::Consensus => "Consensus",
            NodeLabel::PeerReview => "PeerReview",
            NodeLabel::ConflictEvent => "ConflictEvent",
            NodeLabel::Emotion => "Emotion",
        }
    }

    /// Labels that hold memory records
    pub fn is_memory(&self) -> bool {
        matches!(self, NodeLabel::Event | NodeLabel::CoreMemory)
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: NodeLabel,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl GraphNode {
    pub fn new(label: NodeLabel, properties: Properties) -> Self {
        Self {
            id: NodeId::new(),
            label,
            properties,
            archived: false,
            created_at: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    /// Deserialize the property bag into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RepositoryError> {
        Ok(serde_json::from_value(Value::Object(self.properties.clone()))?)
    }

    /// Deserialize a single property, `None` when absent or null
    pub fn decode_property<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, RepositoryError> {
        match self.properties.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }
}

/// Serialize a typed record into a property bag
pub fn to_properties<T: Serialize>(value: &T) -> Result<Properties, RepositoryError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::Serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Directed, typed edge in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub edge_type: String,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
}

impl GraphEdge {
    pub fn new(from_node: NodeId, to_node: NodeId, edge_type: impl Into<String>) -> Self {
        Self {
            id: EdgeId::new(),
            from_node,
            to_node,
            edge_type: edge_type.into(),
            properties: Properties::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}

/// Edge types the engine writes for its own bookkeeping. These never come
/// from the mutable link taxonomy.
pub mod links {
    pub const REVIEWS: &str = "REVIEWS";
    pub const PROMOTED_FROM: &str = "PROMOTED_FROM";
    pub const TAGGED_WITH: &str = "TAGGED_WITH";
    pub const CONSENSUS_FOR: &str = "CONSENSUS_FOR";

    /// Preferred contradiction types, used when the taxonomy offers them
    pub const CONTRADICTS: &str = "CONTRADICTS";
    pub const CONTRADICTS_AGENT: &str = "CONTRADICTS_AGENT";

    pub const STRUCTURAL: [&str; 4] = [REVIEWS, PROMOTED_FROM, TAGGED_WITH, CONSENSUS_FOR];
}

/// How the mesh synthesizer treats a link type discovered in the taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    /// Engine bookkeeping, never created by the synthesizer
    Structural,
    /// Contradiction aimed at agents rather than memories
    AgentContradiction,
    /// One tension link to the least similar match
    Contradiction,
    /// Only where topics overlap
    TopicOverlap,
    /// From the event to a value node
    ValueExpression,
    /// Every top-k match. Also the fallback for unrecognised types.
    Similarity,
}

impl LinkClass {
    pub fn classify(link_type: &str) -> Self {
        let upper = link_type.to_ascii_uppercase();

        if links::STRUCTURAL.contains(&upper.as_str()) {
            LinkClass::Structural
        } else if upper.contains("CONTRADICT") && upper.contains("AGENT") {
            LinkClass::AgentContradiction
        } else if upper.contains("CONTRADICT") {
            LinkClass::Contradiction
        } else if upper.contains("TOPIC") {
            LinkClass::TopicOverlap
        } else if upper.contains("EXPRESS") || upper.contains("EMBOD") {
            LinkClass::ValueExpression
        } else {
            LinkClass::Similarity
        }
    }
}

/// Pick an edge type from the known taxonomy: the preferred name when known,
/// otherwise the first known type of the wanted class, otherwise the
/// preferred name itself.
pub fn select_link_type(known: &[String], preferred: &str, class: LinkClass) -> String {
    if known.iter().any(|t| t == preferred) {
        return preferred.to_string();
    }
    known
        .iter()
        .find(|t| LinkClass::classify(t) == class)
        .cloned()
        .unwrap_or_else(|| preferred.to_string())
}

/// Filter for [`super::repository::GraphRepository::query_nodes`]
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub label: Option<NodeLabel>,
    pub equals: Vec<(String, Value)>,
    pub include_archived: bool,
}

impl NodeFilter {
    pub fn label(label: NodeLabel) -> Self {
        Self {
            label: Some(label),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((key.into(), value.into()));
        self
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn matches(&self, node: &GraphNode) -> bool {
        if !self.include_archived && node.archived {
            return false;
        }
        if let Some(label) = self.label {
            if node.label != label {
                return false;
            }
        }
        self.equals
            .iter()
            .all(|(key, value)| node.properties.get(key) == Some(value))
    }
}

/// Sort order for node queries
#[derive(Debug, Clone)]
pub struct NodeSort {
    pub field: String,
    pub descending: bool,
}

impl NodeSort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_link_types() {
        assert_eq!(LinkClass::classify("RELATED_TO"), LinkClass::Similarity);
        assert_eq!(LinkClass::classify("SUPPORTS"), LinkClass::Similarity);
        assert_eq!(LinkClass::classify("CONTRADICTS"), LinkClass::Contradiction);
        assert_eq!(
            LinkClass::classify("CONTRADICTS_AGENT"),
            LinkClass::AgentContradiction
        );
        assert_eq!(LinkClass::classify("TOPIC_MATCH"), LinkClass::TopicOverlap);
        assert_eq!(LinkClass::classify("EXPRESSES"), LinkClass::ValueExpression);
        assert_eq!(LinkClass::classify("embodies"), LinkClass::ValueExpression);
        assert_eq!(LinkClass::classify("REVIEWS"), LinkClass::Structural);
        assert_eq!(LinkClass::classify("INSPIRED_BY"), LinkClass::Similarity);
    }

    #[test]
    fn test_select_link_type_prefers_exact_name() {
        let known = vec!["RELATED_TO".to_string(), "CONTRADICTS".to_string()];
        assert_eq!(
            select_link_type(&known, links::CONTRADICTS, LinkClass::Contradiction),
            "CONTRADICTS"
        );
    }

    #[test]
    fn test_select_link_type_falls_back_to_class_then_default() {
        let known = vec!["RELATED_TO".to_string(), "IN_TENSION_CONTRADICTING".to_string()];
        assert_eq!(
            select_link_type(&known, links::CONTRADICTS, LinkClass::Contradiction),
            "IN_TENSION_CONTRADICTING"
        );

        let known = vec!["RELATED_TO".to_string()];
        assert_eq!(
            select_link_type(&known, links::CONTRADICTS, LinkClass::Contradiction),
            "CONTRADICTS"
        );
    }

    #[test]
    fn test_filter_skips_archived_by_default() {
        let mut node = GraphNode::new(NodeLabel::Event, Properties::new());
        node.properties.insert("promoted".into(), json!(true));
        node.archived = true;

        assert!(!NodeFilter::label(NodeLabel::Event).matches(&node));
        assert!(NodeFilter::label(NodeLabel::Event)
            .including_archived()
            .with_property("promoted", true)
            .matches(&node));
        assert!(!NodeFilter::label(NodeLabel::CoreMemory)
            .including_archived()
            .matches(&node));
    }

    #[test]
    fn test_decode_property() {
        let mut node = GraphNode::new(NodeLabel::Event, Properties::new());
        node.properties.insert("topics".into(), json!(["ocean", "care"]));
        node.properties.insert("summary".into(), Value::Null);

        let topics: Option<Vec<String>> = node.decode_property("topics").unwrap();
        assert_eq!(topics.unwrap(), vec!["ocean", "care"]);
        let summary: Option<String> = node.decode_property("summary").unwrap();
        assert!(summary.is_none());
    }
}
