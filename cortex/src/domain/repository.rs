// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage collaborator interfaces
//!
//! | Trait | Responsibility | Implementations |
//! |-------|----------------|-----------------|
//! | `GraphRepository` | nodes, edges, branch traversal, archival | `InMemoryGraphRepository` |
//! | `VectorSearch` | top-k similarity over stored value vectors | `InMemoryGraphRepository` |
//! | `LinkTaxonomy` | link types currently known to the system | `InMemoryGraphRepository` |
//!
//! Property values are opaque JSON to the store. Typed records are
//! serialized by the engine before they reach these traits.

use async_trait::async_trait;

use super::errors::RepositoryError;
use super::graph::{GraphEdge, GraphNode, NodeFilter, NodeId, NodeLabel, NodeSort, Properties};
use super::vector::ValueVector;

#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn create_node(
        &self,
        label: NodeLabel,
        properties: Properties,
    ) -> Result<GraphNode, RepositoryError>;

    async fn create_relationship(
        &self,
        from: NodeId,
        to: NodeId,
        edge_type: &str,
        properties: Properties,
    ) -> Result<GraphEdge, RepositoryError>;

    async fn find_node(&self, id: NodeId) -> Result<Option<GraphNode>, RepositoryError>;

    async fn query_nodes(
        &self,
        filter: &NodeFilter,
        sort: Option<&NodeSort>,
        limit: Option<usize>,
    ) -> Result<Vec<GraphNode>, RepositoryError>;

    /// Merge `updates` into the node's properties
    async fn update_node(
        &self,
        id: NodeId,
        updates: Properties,
    ) -> Result<GraphNode, RepositoryError>;

    /// Edges touching a node in either direction
    async fn edges_of(&self, id: NodeId) -> Result<Vec<GraphEdge>, RepositoryError>;

    /// The node itself plus everything reachable from it via outgoing edges
    async fn traverse_branch(&self, id: NodeId) -> Result<Vec<NodeId>, RepositoryError>;

    async fn archive_node(&self, id: NodeId) -> Result<(), RepositoryError>;

    async fn restore_node(&self, id: NodeId) -> Result<(), RepositoryError>;
}

/// A search hit with its cosine similarity to the query
#[derive(Debug, Clone)]
pub struct SimilarNode {
    pub node: GraphNode,
    pub similarity: f64,
}

#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Most similar non-archived memories, best first
    async fn search(
        &self,
        vector: &ValueVector,
        top_k: usize,
    ) -> Result<Vec<SimilarNode>, RepositoryError>;
}

/// Queried fresh before every use; never cached across pipeline runs
#[async_trait]
pub trait LinkTaxonomy: Send + Sync {
    async fn known_types(&self) -> Result<Vec<String>, RepositoryError>;
}
