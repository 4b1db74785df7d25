// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory graph repository
//!
//! Implements the graph, vector-search and link-taxonomy collaborators over
//! shared maps. The whole store can be written to and read back from a JSON
//! snapshot, which is how the CLI keeps state between invocations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::errors::RepositoryError;
use crate::domain::graph::{
    EdgeId, GraphEdge, GraphNode, NodeFilter, NodeId, NodeLabel, NodeSort, Properties,
};
use crate::domain::repository::{GraphRepository, LinkTaxonomy, SimilarNode, VectorSearch};
use crate::domain::vector::ValueVector;

/// Semantic link types a fresh store knows about
pub const DEFAULT_LINK_TYPES: [&str; 7] = [
    "RELATED_TO",
    "SUPPORTS",
    "CONTRADICTS",
    "TOPIC_MATCH",
    "EXPRESSES",
    "EMBODIES",
    "CONTRADICTS_AGENT",
];

/// Serialized form of the whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub link_types: Vec<String>,
}

pub struct InMemoryGraphRepository {
    nodes: Arc<RwLock<HashMap<NodeId, GraphNode>>>,
    edges: Arc<RwLock<HashMap<EdgeId, GraphEdge>>>,
    link_types: Arc<RwLock<Vec<String>>>,
}

impl InMemoryGraphRepository {
    /// Empty store with an empty link taxonomy
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            edges: Arc::new(RwLock::new(HashMap::new())),
            link_types: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Empty store seeded with [`DEFAULT_LINK_TYPES`]
    pub fn with_default_taxonomy() -> Self {
        Self {
            link_types: Arc::new(RwLock::new(
                DEFAULT_LINK_TYPES.iter().map(|t| t.to_string()).collect(),
            )),
            ..Self::new()
        }
    }

    /// Add a link type to the taxonomy. Returns false if it was already known.
    pub async fn register_link_type(&self, link_type: impl Into<String>) -> bool {
        let link_type = link_type.into();
        let mut types = self.link_types.write().await;
        if types.contains(&link_type) {
            return false;
        }
        debug!(link_type = %link_type, "Registered link type");
        types.push(link_type);
        true
    }

    pub async fn remove_link_type(&self, link_type: &str) -> bool {
        let mut types = self.link_types.write().await;
        let before = types.len();
        types.retain(|t| t != link_type);
        types.len() != before
    }

    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn edges_from(&self, id: NodeId) -> Vec<GraphEdge> {
        let edges = self.edges.read().await;
        let mut found: Vec<GraphEdge> = edges
            .values()
            .filter(|edge| edge.from_node == id)
            .cloned()
            .collect();
        found.sort_by_key(|edge| edge.created_at);
        found
    }

    pub async fn snapshot(&self) -> GraphSnapshot {
        let nodes = self.nodes.read().await;
        let edges = self.edges.read().await;
        let link_types = self.link_types.read().await;

        let mut snapshot = GraphSnapshot {
            nodes: nodes.values().cloned().collect(),
            edges: edges.values().cloned().collect(),
            link_types: link_types.clone(),
        };
        snapshot
            .nodes
            .sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        snapshot.edges.sort_by_key(|edge| edge.created_at);
        snapshot
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self {
            nodes: Arc::new(RwLock::new(
                snapshot.nodes.into_iter().map(|n| (n.id, n)).collect(),
            )),
            edges: Arc::new(RwLock::new(
                snapshot.edges.into_iter().map(|e| (e.id, e)).collect(),
            )),
            link_types: Arc::new(RwLock::new(snapshot.link_types)),
        }
    }

    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), RepositoryError> {
        let snapshot = self.snapshot().await;
        let json = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let snapshot: GraphSnapshot = serde_json::from_slice(&bytes)?;
        Ok(Self::from_snapshot(snapshot))
    }

    async fn set_archived(&self, id: NodeId, archived: bool) -> Result<(), RepositoryError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("node {}", id)))?;
        node.archived = archived;
        Ok(())
    }
}

impl Default for InMemoryGraphRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Orders two present property values: numbers numerically before
/// everything else, the rest by their JSON text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_string().cmp(&b.to_string()),
    }
}

/// Sort comparator for a property; nodes missing the property always sort last
fn compare_by(sort: &NodeSort, a: &GraphNode, b: &GraphNode) -> Ordering {
    match (a.get(&sort.field), b.get(&sort.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) if sort.descending => compare_values(y, x),
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn create_node(
        &self,
        label: NodeLabel,
        properties: Properties,
    ) -> Result<GraphNode, RepositoryError> {
        let node = GraphNode::new(label, properties);
        let mut nodes = self.nodes.write().await;
        nodes.insert(node.id, node.clone());
        Ok(node)
    }

    async fn create_relationship(
        &self,
        from: NodeId,
        to: NodeId,
        edge_type: &str,
        properties: Properties,
    ) -> Result<GraphEdge, RepositoryError> {
        {
            let nodes = self.nodes.read().await;
            for id in [from, to] {
                if !nodes.contains_key(&id) {
                    return Err(RepositoryError::NotFound(format!("node {}", id)));
                }
            }
        }

        let edge = GraphEdge::new(from, to, edge_type).with_properties(properties);
        let mut edges = self.edges.write().await;
        edges.insert(edge.id, edge.clone());
        Ok(edge)
    }

    async fn find_node(&self, id: NodeId) -> Result<Option<GraphNode>, RepositoryError> {
        let nodes = self.nodes.read().await;
        Ok(nodes.get(&id).cloned())
    }

    async fn query_nodes(
        &self,
        filter: &NodeFilter,
        sort: Option<&NodeSort>,
        limit: Option<usize>,
    ) -> Result<Vec<GraphNode>, RepositoryError> {
        let nodes = self.nodes.read().await;
        let mut found: Vec<GraphNode> = nodes
            .values()
            .filter(|node| filter.matches(node))
            .cloned()
            .collect();

        // stable base order so unsorted queries are deterministic
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        if let Some(sort) = sort {
            found.sort_by(|a, b| compare_by(sort, a, b));
        }

        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn update_node(
        &self,
        id: NodeId,
        updates: Properties,
    ) -> Result<GraphNode, RepositoryError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("node {}", id)))?;
        node.properties.extend(updates);
        Ok(node.clone())
    }

    async fn edges_of(&self, id: NodeId) -> Result<Vec<GraphEdge>, RepositoryError> {
        let edges = self.edges.read().await;
        Ok(edges
            .values()
            .filter(|edge| edge.from_node == id || edge.to_node == id)
            .cloned()
            .collect())
    }

    async fn traverse_branch(&self, id: NodeId) -> Result<Vec<NodeId>, RepositoryError> {
        let nodes = self.nodes.read().await;
        if !nodes.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("node {}", id)));
        }
        let edges = self.edges.read().await;

        let mut visited = HashSet::new();
        let mut to_visit = vec![id];
        let mut result = Vec::new();

        while let Some(current) = to_visit.pop() {
            if !visited.insert(current) || !nodes.contains_key(&current) {
                continue;
            }
            result.push(current);

            for edge in edges.values() {
                if edge.from_node == current && !visited.contains(&edge.to_node) {
                    to_visit.push(edge.to_node);
                }
            }
        }

        Ok(result)
    }

    async fn archive_node(&self, id: NodeId) -> Result<(), RepositoryError> {
        self.set_archived(id, true).await
    }

    async fn restore_node(&self, id: NodeId) -> Result<(), RepositoryError> {
        self.set_archived(id, false).await
    }
}

#[async_trait]
impl VectorSearch for InMemoryGraphRepository {
    async fn search(
        &self,
        vector: &ValueVector,
        top_k: usize,
    ) -> Result<Vec<SimilarNode>, RepositoryError> {
        let nodes = self.nodes.read().await;
        let mut hits = Vec::new();

        for node in nodes.values() {
            if node.archived || !node.label.is_memory() {
                continue;
            }
            let Some(candidate) = node.decode_property::<ValueVector>("value_vector")? else {
                continue;
            };
            if candidate.is_empty() {
                continue;
            }
            hits.push(SimilarNode {
                similarity: vector.cosine_similarity(&candidate),
                node: node.clone(),
            });
        }

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.node.created_at.cmp(&b.node.created_at))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[async_trait]
impl LinkTaxonomy for InMemoryGraphRepository {
    async fn known_types(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.link_types.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::to_properties;
    use crate::domain::vector::SchemaVersion;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_node() {
        let repo = InMemoryGraphRepository::new();
        let node = repo
            .create_node(NodeLabel::Event, props(json!({ "raw_text": "hello" })))
            .await
            .unwrap();

        let found = repo.find_node(node.id).await.unwrap().unwrap();
        assert_eq!(found.get_str("raw_text"), Some("hello"));
        assert!(!found.archived);
    }

    #[tokio::test]
    async fn test_relationship_requires_both_nodes() {
        let repo = InMemoryGraphRepository::new();
        let a = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();

        let result = repo
            .create_relationship(a.id, NodeId::new(), "RELATED_TO", Properties::new())
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_merges_properties() {
        let repo = InMemoryGraphRepository::new();
        let node = repo
            .create_node(NodeLabel::Event, props(json!({ "a": 1, "b": 2 })))
            .await
            .unwrap();

        let updated = repo
            .update_node(node.id, props(json!({ "b": 3, "c": 4 })))
            .await
            .unwrap();
        assert_eq!(updated.get("a"), Some(&json!(1)));
        assert_eq!(updated.get("b"), Some(&json!(3)));
        assert_eq!(updated.get("c"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn test_query_sorts_and_limits() {
        let repo = InMemoryGraphRepository::new();
        for score in [0.2, 0.9, 0.5] {
            repo.create_node(NodeLabel::CoreMemory, props(json!({ "relevance_score": score })))
                .await
                .unwrap();
        }
        repo.create_node(NodeLabel::CoreMemory, Properties::new())
            .await
            .unwrap();

        let sort = NodeSort::descending("relevance_score");
        let found = repo
            .query_nodes(&NodeFilter::label(NodeLabel::CoreMemory), Some(&sort), Some(3))
            .await
            .unwrap();
        let scores: Vec<f64> = found.iter().filter_map(|n| n.get_f64("relevance_score")).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[tokio::test]
    async fn test_traverse_branch_follows_outgoing_edges_only() {
        let repo = InMemoryGraphRepository::new();
        let root = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();
        let child = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();
        let grandchild = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();
        let parent = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();

        repo.create_relationship(root.id, child.id, "RELATED_TO", Properties::new())
            .await
            .unwrap();
        repo.create_relationship(child.id, grandchild.id, "SUPPORTS", Properties::new())
            .await
            .unwrap();
        repo.create_relationship(parent.id, root.id, "RELATED_TO", Properties::new())
            .await
            .unwrap();
        // cycle back to the root must not loop
        repo.create_relationship(grandchild.id, root.id, "RELATED_TO", Properties::new())
            .await
            .unwrap();

        let branch: HashSet<NodeId> = repo.traverse_branch(root.id).await.unwrap().into_iter().collect();
        assert_eq!(branch, HashSet::from([root.id, child.id, grandchild.id]));
    }

    #[tokio::test]
    async fn test_archive_and_restore() {
        let repo = InMemoryGraphRepository::new();
        let node = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();

        repo.archive_node(node.id).await.unwrap();
        let visible = repo
            .query_nodes(&NodeFilter::label(NodeLabel::Event), None, None)
            .await
            .unwrap();
        assert!(visible.is_empty());

        repo.restore_node(node.id).await.unwrap();
        let visible = repo
            .query_nodes(&NodeFilter::label(NodeLabel::Event), None, None)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let repo = InMemoryGraphRepository::new();
        let close = ValueVector::with_scores(SchemaVersion(1), [("care".to_string(), 0.9)]);
        let far = ValueVector::with_scores(SchemaVersion(1), [("growth".to_string(), 0.9)]);

        let close_node = repo
            .create_node(
                NodeLabel::Event,
                props(json!({ "value_vector": serde_json::to_value(&close).unwrap() })),
            )
            .await
            .unwrap();
        repo.create_node(
            NodeLabel::CoreMemory,
            props(json!({ "value_vector": serde_json::to_value(&far).unwrap() })),
        )
        .await
        .unwrap();
        // non-memory labels are never returned
        repo.create_node(
            NodeLabel::Consensus,
            props(json!({ "value_vector": serde_json::to_value(&close).unwrap() })),
        )
        .await
        .unwrap();

        let hits = repo.search(&close, 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node.id, close_node.id);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn test_taxonomy_registration() {
        let repo = InMemoryGraphRepository::with_default_taxonomy();
        assert!(repo.known_types().await.unwrap().contains(&"CONTRADICTS".to_string()));
        assert!(repo.register_link_type("INSPIRED_BY").await);
        assert!(!repo.register_link_type("INSPIRED_BY").await);
        assert!(repo.remove_link_type("CONTRADICTS").await);
        assert!(!repo.known_types().await.unwrap().contains(&"CONTRADICTS".to_string()));
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let repo = InMemoryGraphRepository::with_default_taxonomy();
        let a = repo
            .create_node(NodeLabel::Event, to_properties(&json!({ "raw_text": "a" })).unwrap())
            .await
            .unwrap();
        let b = repo.create_node(NodeLabel::Event, Properties::new()).await.unwrap();
        repo.create_relationship(a.id, b.id, "RELATED_TO", Properties::new())
            .await
            .unwrap();
        repo.archive_node(b.id).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        repo.save_snapshot(&path).await.unwrap();

        let restored = InMemoryGraphRepository::load_snapshot(&path).await.unwrap();
        assert_eq!(restored.node_count().await, 2);
        assert!(restored.find_node(b.id).await.unwrap().unwrap().archived);
        assert_eq!(restored.edges_from(a.id).await.len(), 1);
        assert_eq!(
            restored.known_types().await.unwrap().len(),
            DEFAULT_LINK_TYPES.len()
        );
    }
}
