// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mesh Synthesizer
//!
//! Links a freshly processed event into the existing memory graph. The link
//! taxonomy is queried on every call and each type is handled by its
//! [`LinkClass`]:
//!
//! | Class              | Targets                                              |
//! |--------------------|------------------------------------------------------|
//! | Similarity         | every top-k match (also any unrecognised type)       |
//! | Contradiction      | the least similar match, one type only               |
//! | TopicOverlap       | matches sharing at least one topic                   |
//! | ValueExpression    | value nodes whose fused score exceeds the threshold  |
//! | Structural, agent contradictions | never created here                     |

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::config::MeshConfig;
use crate::domain::errors::CortexResult;
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{links, LinkClass, NodeId, Properties};
use crate::domain::memory::MemoryRecord;
use crate::domain::repository::{GraphRepository, LinkTaxonomy, SimilarNode, VectorSearch};
use crate::domain::vector::ValueVector;

use super::value_schema::ValueSchemaRegistry;

/// One edge written by the synthesizer
#[derive(Debug, Clone, PartialEq)]
pub struct MeshEdge {
    pub edge_type: String,
    pub target: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshReport {
    pub edges: Vec<MeshEdge>,
}

impl MeshReport {
    pub fn edges_created(&self) -> usize {
        self.edges.len()
    }

    pub fn targets_of(&self, edge_type: &str) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.edge_type == edge_type)
            .map(|e| e.target)
            .collect()
    }
}

/// A search hit decoded as a memory
struct Candidate {
    record: MemoryRecord,
    similarity: f64,
}

pub struct MeshSynthesizer {
    search: Arc<dyn VectorSearch>,
    taxonomy: Arc<dyn LinkTaxonomy>,
    repository: Arc<dyn GraphRepository>,
    registry: Arc<ValueSchemaRegistry>,
    event_bus: Arc<dyn EventBus>,
    config: MeshConfig,
}

impl MeshSynthesizer {
    pub fn new(
        search: Arc<dyn VectorSearch>,
        taxonomy: Arc<dyn LinkTaxonomy>,
        repository: Arc<dyn GraphRepository>,
        registry: Arc<ValueSchemaRegistry>,
        event_bus: Arc<dyn EventBus>,
        config: MeshConfig,
    ) -> Self {
        Self {
            search,
            taxonomy,
            repository,
            registry,
            event_bus,
            config,
        }
    }

    pub async fn create_mesh_edges(
        &self,
        event_id: NodeId,
        vector: &ValueVector,
        event: &MemoryRecord,
    ) -> CortexResult<MeshReport> {
        let known = self.taxonomy.known_types().await?;
        let candidates = self.candidates(event_id, vector).await?;
        let contradiction_type = contradiction_type(&known);

        let mut report = MeshReport::default();
        for link_type in &known {
            match LinkClass::classify(link_type) {
                LinkClass::Structural | LinkClass::AgentContradiction => {}
                LinkClass::Contradiction => {
                    if contradiction_type != Some(link_type.as_str()) || candidates.len() < 2 {
                        continue;
                    }
                    let least_similar = candidates
                        .iter()
                        .min_by(|a, b| a.similarity.total_cmp(&b.similarity));
                    if let Some(candidate) = least_similar {
                        self.link_memory(&mut report, event_id, vector, link_type, candidate, None)
                            .await?;
                    }
                }
                LinkClass::TopicOverlap => {
                    for candidate in &candidates {
                        let shared = shared_topics(event, &candidate.record);
                        if !shared.is_empty() {
                            self.link_memory(&mut report, event_id, vector, link_type, candidate, Some(shared))
                                .await?;
                        }
                    }
                }
                LinkClass::ValueExpression => {
                    self.link_values(&mut report, event_id, vector, link_type).await?;
                }
                LinkClass::Similarity => {
                    for candidate in &candidates {
                        self.link_memory(&mut report, event_id, vector, link_type, candidate, None)
                            .await?;
                    }
                }
            }
        }

        info!(
            event_id = %event_id,
            candidates = candidates.len(),
            edges = report.edges_created(),
            "Mesh edges created"
        );
        self.event_bus.publish(CortexEvent::MeshLinked {
            event_id,
            edges_created: report.edges_created(),
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    /// Top-k most similar memories other than the event itself and the core
    /// memories promoted from it
    async fn candidates(&self, event_id: NodeId, vector: &ValueVector) -> CortexResult<Vec<Candidate>> {
        if vector.is_empty() {
            return Ok(Vec::new());
        }
        // room for the event and one promoted copy
        let hits = self.search.search(vector, self.config.top_k + 2).await?;
        let mut candidates = Vec::with_capacity(self.config.top_k);
        for SimilarNode { node, similarity } in hits {
            if node.id == event_id {
                continue;
            }
            let record = MemoryRecord::from_node(&node)?;
            if record.source_event_id == Some(event_id) {
                continue;
            }
            candidates.push(Candidate { record, similarity });
            if candidates.len() == self.config.top_k {
                break;
            }
        }
        Ok(candidates)
    }

    async fn link_memory(
        &self,
        report: &mut MeshReport,
        event_id: NodeId,
        vector: &ValueVector,
        link_type: &str,
        candidate: &Candidate,
        shared_topics: Option<Vec<String>>,
    ) -> CortexResult<()> {
        let target = candidate.record.id;
        let mut properties = Properties::new();
        properties.insert("value_schema_version".into(), json!(vector.schema_version));
        properties.insert("source_event_id".into(), json!(event_id));
        properties.insert("target_id".into(), json!(target));
        properties.insert(
            "alignment_score".into(),
            json!(vector.cosine_similarity(&candidate.record.value_vector)),
        );
        properties.insert(
            "value_vector_diff".into(),
            json!(vector.abs_diff(&candidate.record.value_vector)),
        );
        if let Some(shared) = shared_topics {
            properties.insert("shared_topics".into(), json!(shared));
        }

        self.repository
            .create_relationship(event_id, target, link_type, properties)
            .await?;
        debug!(event_id = %event_id, target = %target, edge_type = link_type, "Mesh edge");
        report.edges.push(MeshEdge {
            edge_type: link_type.to_string(),
            target,
        });
        Ok(())
    }

    async fn link_values(
        &self,
        report: &mut MeshReport,
        event_id: NodeId,
        vector: &ValueVector,
        link_type: &str,
    ) -> CortexResult<()> {
        let schema = self.registry.get_pool().await?;
        for axis in schema.active_axes() {
            let score = vector.get(&axis.name);
            if score <= self.config.value_link_threshold {
                continue;
            }
            let mut properties = Properties::new();
            properties.insert("score".into(), json!(score));
            properties.insert("value_schema_version".into(), json!(vector.schema_version));
            self.repository
                .create_relationship(event_id, axis.id, link_type, properties)
                .await?;
            report.edges.push(MeshEdge {
                edge_type: link_type.to_string(),
                target: axis.id,
            });
        }
        Ok(())
    }
}

/// The single contradiction type used for tension links
fn contradiction_type(known: &[String]) -> Option<&str> {
    known
        .iter()
        .find(|t| t.as_str() == links::CONTRADICTS)
        .or_else(|| {
            known
                .iter()
                .find(|t| LinkClass::classify(t) == LinkClass::Contradiction)
        })
        .map(String::as_str)
}

/// Topics both memories carry, compared case-insensitively
pub fn shared_topics(a: &MemoryRecord, b: &MemoryRecord) -> Vec<String> {
    a.topics
        .iter()
        .filter(|topic| b.topics.iter().any(|other| other.eq_ignore_ascii_case(topic)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{to_properties, NodeLabel};
    use crate::domain::memory::MemoryKind;
    use crate::domain::value::ValueAxis;
    use crate::domain::vector::SchemaVersion;
    use crate::infrastructure::{BroadcastEventBus, InMemoryGraphRepository};

    struct Fixture {
        repo: Arc<InMemoryGraphRepository>,
        registry: Arc<ValueSchemaRegistry>,
        synthesizer: MeshSynthesizer,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let bus = Arc::new(BroadcastEventBus::new(64));
        let registry = Arc::new(ValueSchemaRegistry::new(repo.clone(), bus.clone()));
        let synthesizer = MeshSynthesizer::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            registry.clone(),
            bus,
            MeshConfig::default(),
        );
        Fixture {
            repo,
            registry,
            synthesizer,
        }
    }

    fn vv(empathy: f64, courage: f64) -> ValueVector {
        ValueVector::with_scores(
            SchemaVersion(1),
            [("empathy".to_string(), empathy), ("courage".to_string(), courage)],
        )
    }

    async fn memory(repo: &InMemoryGraphRepository, vector: ValueVector, topics: &[&str]) -> MemoryRecord {
        let record = MemoryRecord {
            value_vector: vector,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            ..MemoryRecord::default()
        };
        let node = repo
            .create_node(NodeLabel::Event, to_properties(&record).unwrap())
            .await
            .unwrap();
        MemoryRecord::from_node(&node).unwrap()
    }

    #[tokio::test]
    async fn test_similarity_links_every_match_but_not_self() {
        let f = fixture();
        f.repo.register_link_type("RELATED_TO").await;
        let event = memory(&f.repo, vv(0.9, 0.1), &[]).await;
        let a = memory(&f.repo, vv(0.8, 0.2), &[]).await;
        let b = memory(&f.repo, vv(0.1, 0.9), &[]).await;

        let report = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        let mut targets = report.targets_of("RELATED_TO");
        targets.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(targets, expected);

        let edges = f.repo.edges_from(event.id).await;
        let edge = edges.iter().find(|e| e.to_node == a.id).unwrap();
        assert_eq!(edge.properties["source_event_id"], json!(event.id));
        assert!(edge.properties["alignment_score"].as_f64().unwrap() > 0.9);
        assert!(edge.properties.contains_key("value_vector_diff"));
    }

    #[tokio::test]
    async fn test_core_memory_promoted_from_event_is_not_a_candidate() {
        let f = fixture();
        f.repo.register_link_type("RELATED_TO").await;
        let event = memory(&f.repo, vv(0.9, 0.1), &[]).await;
        let copy = MemoryRecord {
            kind: MemoryKind::CoreMemory,
            value_vector: event.value_vector.clone(),
            source_event_id: Some(event.id),
            ..MemoryRecord::default()
        };
        f.repo
            .create_node(NodeLabel::CoreMemory, to_properties(&copy).unwrap())
            .await
            .unwrap();
        let other = memory(&f.repo, vv(0.7, 0.3), &[]).await;

        let report = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(report.targets_of("RELATED_TO"), vec![other.id]);
    }

    #[tokio::test]
    async fn test_single_contradiction_to_least_similar() {
        let f = fixture();
        f.repo.register_link_type("CONTRADICTS").await;
        f.repo.register_link_type("CONTRADICTS_AGENT").await;
        let event = memory(&f.repo, vv(0.9, 0.1), &[]).await;
        let _close = memory(&f.repo, vv(0.8, 0.2), &[]).await;
        let far = memory(&f.repo, vv(0.0, 1.0), &[]).await;

        let report = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(report.edges_created(), 1);
        assert_eq!(report.targets_of("CONTRADICTS"), vec![far.id]);
    }

    #[tokio::test]
    async fn test_topic_links_require_shared_topic() {
        let f = fixture();
        f.repo.register_link_type("TOPIC_MATCH").await;
        let event = memory(&f.repo, vv(0.9, 0.1), &["Ocean", "family"]).await;
        let shared = memory(&f.repo, vv(0.8, 0.2), &["ocean"]).await;
        let _unrelated = memory(&f.repo, vv(0.8, 0.2), &["work"]).await;

        let report = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(report.targets_of("TOPIC_MATCH"), vec![shared.id]);
        let edges = f.repo.edges_from(event.id).await;
        assert_eq!(edges[0].properties["shared_topics"], json!(["Ocean"]));
    }

    #[tokio::test]
    async fn test_value_expression_links_to_value_nodes() {
        let f = fixture();
        f.repo.register_link_type("EXPRESSES").await;
        let empathy = f
            .registry
            .add_axis("test", ValueAxis::new("empathy", "care", 0.5, "test"))
            .await
            .unwrap();
        f.registry
            .add_axis("test", ValueAxis::new("courage", "nerve", 0.5, "test"))
            .await
            .unwrap();
        let event = memory(&f.repo, vv(0.9, 0.7), &[]).await;

        let report = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(report.targets_of("EXPRESSES"), vec![empathy.id]);
    }

    #[tokio::test]
    async fn test_unknown_types_fall_back_to_similarity() {
        let f = fixture();
        f.repo.register_link_type("INSPIRED_BY").await;
        f.repo.register_link_type("REVIEWS").await;
        let event = memory(&f.repo, vv(0.9, 0.1), &[]).await;
        let other = memory(&f.repo, vv(0.8, 0.2), &[]).await;

        let report = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(report.targets_of("INSPIRED_BY"), vec![other.id]);
        assert!(report.targets_of("REVIEWS").is_empty());
    }

    #[tokio::test]
    async fn test_taxonomy_changes_are_seen_on_next_call() {
        let f = fixture();
        let event = memory(&f.repo, vv(0.9, 0.1), &[]).await;
        memory(&f.repo, vv(0.8, 0.2), &[]).await;

        let before = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(before.edges_created(), 0);

        f.repo.register_link_type("SUPPORTS").await;
        let after = f
            .synthesizer
            .create_mesh_edges(event.id, &event.value_vector, &event)
            .await
            .unwrap();
        assert_eq!(after.edges_created(), 1);
    }
}
