// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Memory Lifecycle Manager
//!
//! Evaluation, promotion, emotion tagging, decay, archival and resurfacing of
//! memories in the graph.
//!
//! # Lifecycle
//!
//! ```text
//! ingest -> evaluate -+-> promote (score >= threshold) -> CoreMemory
//!                     +-> prune   (score <= prune threshold)
//!                     +-> decay_rate set
//!
//! maintenance: decay -> archive branch (decayed < prune threshold)
//!              restore_branch reverses an archival
//! ```
//!
//! Archival walks every outgoing edge from the pruned node. Value and Agent
//! nodes reached that way are shared by the whole graph and are left alone.
//! Nothing is ever deleted.
//!
//! Callers must not issue overlapping evaluate or decay calls against the same
//! memory; there are no cross-event locks.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::config::MemoryConfig;
use crate::domain::errors::{CortexError, CortexResult};
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{links, to_properties, NodeFilter, NodeId, NodeLabel, NodeSort, Properties};
use crate::domain::memory::{
    decayed_score, promotion_threshold, DecayPolicy, EvaluationContext, MemoryKind, MemoryRecord,
    NewEvent, ScoreInputs,
};
use crate::domain::repository::GraphRepository;

use super::vector_scorer::VectorScorer;

/// What one evaluation decided
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub memory_id: NodeId,
    pub score: f64,
    pub threshold: f64,
    pub inputs: ScoreInputs,
    /// Core memory created by this evaluation
    pub promoted: Option<NodeId>,
    pub emotion_node: Option<NodeId>,
    /// The score fell to the prune threshold and the branch was archived
    pub pruned: bool,
}

impl EvaluationResult {
    pub fn promoted(&self) -> bool {
        self.promoted.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecayReport {
    pub examined: usize,
    pub decayed: usize,
    /// Memories whose decayed score crossed the prune threshold
    pub pruned_roots: Vec<NodeId>,
    /// Every node archived by those prunes
    pub archived: usize,
}

pub struct MemoryLifecycleManager {
    repository: Arc<dyn GraphRepository>,
    scorer: Option<Arc<VectorScorer>>,
    event_bus: Arc<dyn EventBus>,
    config: MemoryConfig,
}

impl MemoryLifecycleManager {
    pub fn new(
        repository: Arc<dyn GraphRepository>,
        event_bus: Arc<dyn EventBus>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            repository,
            scorer: None,
            event_bus,
            config,
        }
    }

    /// Attach a scorer used for embeddings on ingest
    pub fn with_scorer(mut self, scorer: Arc<VectorScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn decay_policy(&self) -> DecayPolicy {
        DecayPolicy {
            base_rate: self.config.base_decay_rate,
            floor: self.config.decay_rate_floor,
        }
    }

    /// Create an unscored Event node
    pub async fn ingest_event(&self, event: NewEvent) -> CortexResult<MemoryRecord> {
        if event.raw_text.trim().is_empty() {
            return Err(CortexError::InvalidInput("event text is empty".into()));
        }

        let mut record = MemoryRecord {
            raw_text: event.raw_text,
            summary: event.summary,
            topics: event.topics,
            tags: event.tags,
            user_pinned: event.user_pinned,
            causal_trace: event.causal_trace,
            ..MemoryRecord::default()
        };

        if self.config.embed_on_ingest {
            if let Some(scorer) = &self.scorer {
                match scorer.embed(&record.raw_text).await {
                    Ok(embedding) => record.embedding = Some(embedding),
                    Err(e) => warn!(error = %e, "Embedding failed, event stored without one"),
                }
            }
        }
        record.audit_log.append("ingested", json!({ "pinned": record.user_pinned }));

        let node = self
            .repository
            .create_node(NodeLabel::Event, to_properties(&record)?)
            .await?;
        info!(event_id = %node.id, topics = ?record.topics, "Event ingested");
        MemoryRecord::from_node(&node).map_err(Into::into)
    }

    pub async fn load(&self, id: NodeId) -> CortexResult<MemoryRecord> {
        let node = self
            .repository
            .find_node(id)
            .await?
            .ok_or(CortexError::NodeNotFound(id))?;
        Ok(MemoryRecord::from_node(&node)?)
    }

    /// Memories of one kind (or both), newest first
    pub async fn list(
        &self,
        kind: Option<MemoryKind>,
        include_archived: bool,
        limit: Option<usize>,
    ) -> CortexResult<Vec<MemoryRecord>> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => vec![MemoryKind::Event, MemoryKind::CoreMemory],
        };

        let mut records = Vec::new();
        for kind in kinds {
            let mut filter = NodeFilter::label(kind.label());
            if include_archived {
                filter = filter.including_archived();
            }
            for node in self.repository.query_nodes(&filter, None, None).await? {
                records.push(MemoryRecord::from_node(&node)?);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Score a memory, then promote, tag and prune it as the score dictates
    pub async fn evaluate_event(
        &self,
        id: NodeId,
        context: &EvaluationContext,
    ) -> CortexResult<EvaluationResult> {
        let mut record = self.load(id).await?;
        if record.archived {
            return Err(CortexError::InvalidInput(format!("memory {} is archived", id)));
        }

        let inputs = ScoreInputs::for_record(&record, context);
        let score = inputs.score();
        let agent_priority = context.agent_priority.or(record.agent_priority);
        let threshold = promotion_threshold(
            record.promotion_threshold.unwrap_or(self.config.promotion_base),
            self.config.priority_discount,
            agent_priority,
        );

        let now = Utc::now();
        record.relevance_score = Some(score);
        record.novelty_score = Some(inputs.novelty);
        record.agent_priority = agent_priority;
        record.last_evaluated = Some(now);
        record.audit_log.append_at(
            "evaluated",
            json!({
                "inputs": inputs,
                "score": score,
                "threshold": threshold,
                "active_theme": context.active_theme,
            }),
            now,
        );
        self.persist(&record).await?;

        info!(memory_id = %id, score, threshold, "Memory evaluated");
        self.event_bus.publish(CortexEvent::MemoryEvaluated {
            memory_id: id,
            score,
            threshold,
            timestamp: now,
        });

        // core memories are not promoted again
        let promoted = if score >= threshold && record.kind == MemoryKind::Event {
            Some(self.promote_to_core_memory(id, context.rationale.as_deref()).await?)
        } else {
            None
        };

        let emotion_node = if self.config.emotion_tagging && record.emotion_tag.is_none() {
            self.tag_emotion(id).await?
        } else {
            None
        };

        let pruned = if score <= self.config.prune_threshold {
            self.prune_branch(id, "score_below_threshold").await?;
            true
        } else {
            let link_count = self.repository.edges_of(id).await?.len();
            let rate = self.decay_policy().rate_for(&record, link_count);
            self.update(id, [("decay_rate", json!(rate))]).await?;
            false
        };

        Ok(EvaluationResult {
            memory_id: id,
            score,
            threshold,
            inputs,
            promoted,
            emotion_node,
            pruned,
        })
    }

    /// Copy an event into a new CoreMemory linked `PROMOTED_FROM` to it.
    /// Promoting the same event twice creates two core memories.
    pub async fn promote_to_core_memory(
        &self,
        event_id: NodeId,
        rationale: Option<&str>,
    ) -> CortexResult<NodeId> {
        let mut event = self.load(event_id).await?;
        let now = Utc::now();

        let mut causal_trace = event.causal_trace.clone();
        if !causal_trace.contains(&event_id) {
            causal_trace.push(event_id);
        }

        let mut core = MemoryRecord {
            kind: MemoryKind::CoreMemory,
            raw_text: event.raw_text.clone(),
            summary: Some(event.summary_or_text().to_string()),
            rationale: rationale.map(str::to_string),
            topics: event.topics.clone(),
            tags: event.tags.clone(),
            relevance_score: event.relevance_score,
            novelty_score: event.novelty_score,
            agent_alignment: event.agent_alignment,
            agent_priority: event.agent_priority,
            emotion_vector: event.emotion_vector.clone(),
            value_vector: event.value_vector.clone(),
            last_evaluated: Some(now),
            audit_log: event.audit_log.clone(),
            user_pinned: event.user_pinned,
            causal_trace,
            linked_context: event.linked_context.clone(),
            source_event_id: Some(event_id),
            emotion_tag: event.emotion_tag,
            emotion_valence: event.emotion_valence,
            ..MemoryRecord::default()
        };
        core.decay_rate = Some(self.decay_policy().rate_for(&core, 0));
        core.audit_log
            .append_at("promoted", json!({ "source_event_id": event_id }), now);

        let node = self
            .repository
            .create_node(NodeLabel::CoreMemory, to_properties(&core)?)
            .await?;
        let mut properties = Properties::new();
        properties.insert("score".into(), json!(event.relevance_score));
        self.repository
            .create_relationship(node.id, event_id, links::PROMOTED_FROM, properties)
            .await?;

        event.promoted = true;
        event
            .audit_log
            .append_at("promoted_to_core", json!({ "core_memory_id": node.id }), now);
        self.persist(&event).await?;

        let score = event.relevance_score.unwrap_or_default();
        info!(event_id = %event_id, core_memory_id = %node.id, score, "Memory promoted");
        self.event_bus.publish(CortexEvent::MemoryPromoted {
            memory_id: event_id,
            core_memory_id: node.id,
            score,
            timestamp: now,
        });
        Ok(node.id)
    }

    /// Create an Emotion node for the event's dominant emotion.
    /// `None` when the event carries no emotion signal.
    pub async fn tag_emotion(&self, event_id: NodeId) -> CortexResult<Option<NodeId>> {
        let mut event = self.load(event_id).await?;
        let Some((emotion, intensity)) = event.emotion_vector.dominant() else {
            return Ok(None);
        };
        let valence = event.emotion_vector.valence();
        let now = Utc::now();

        let mut properties = Properties::new();
        properties.insert("type".into(), json!(emotion));
        properties.insert("vector".into(), json!(event.emotion_vector));
        properties.insert("intensity".into(), json!(intensity));
        properties.insert("valence".into(), json!(valence));
        properties.insert("agent_assigned".into(), json!(true));
        properties.insert("created_at".into(), json!(now));
        let node = self.repository.create_node(NodeLabel::Emotion, properties).await?;
        self.repository
            .create_relationship(event_id, node.id, links::TAGGED_WITH, Properties::new())
            .await?;

        event.emotion_tag = Some(emotion);
        event.emotion_valence = Some(valence);
        event.audit_log.append_at(
            "emotion_tagged",
            json!({ "emotion": emotion, "intensity": intensity, "valence": valence }),
            now,
        );
        self.persist(&event).await?;

        debug!(event_id = %event_id, emotion = %emotion, valence = %valence, "Emotion tagged");
        Ok(Some(node.id))
    }

    pub async fn run_decay_cycle(&self) -> CortexResult<DecayReport> {
        self.run_decay_cycle_at(Utc::now()).await
    }

    /// Decay every scored, live memory to `now`. A memory whose last
    /// evaluation is not before `now` is left untouched.
    pub async fn run_decay_cycle_at(&self, now: DateTime<Utc>) -> CortexResult<DecayReport> {
        let mut nodes = Vec::new();
        for label in [NodeLabel::Event, NodeLabel::CoreMemory] {
            nodes.extend(self.repository.query_nodes(&NodeFilter::label(label), None, None).await?);
        }
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let policy = self.decay_policy();
        let mut report = DecayReport::default();
        let mut archived_this_cycle = HashSet::new();

        for node in nodes {
            if archived_this_cycle.contains(&node.id) {
                continue;
            }
            report.examined += 1;

            let mut record = MemoryRecord::from_node(&node)?;
            let Some(score) = record.relevance_score else {
                continue;
            };
            let days = (now - record.decay_reference()).num_milliseconds() as f64 / 86_400_000.0;
            if days <= 0.0 {
                continue;
            }

            let link_count = self.repository.edges_of(record.id).await?.len();
            let rate = policy.rate_for(&record, link_count);
            let new_score = decayed_score(score, rate, days);

            record.relevance_score = Some(new_score);
            record.decay_rate = Some(rate);
            record.last_evaluated = Some(now);
            record.audit_log.append_at(
                "decayed",
                json!({ "old_score": score, "new_score": new_score, "decay_rate": rate, "days": days }),
                now,
            );
            self.persist(&record).await?;
            report.decayed += 1;

            debug!(memory_id = %record.id, old_score = score, new_score, decay_rate = rate, "Memory decayed");
            self.event_bus.publish(CortexEvent::MemoryDecayed {
                memory_id: record.id,
                old_score: score,
                new_score,
                decay_rate: rate,
                timestamp: now,
            });

            if new_score < self.config.prune_threshold {
                let archived = self.prune_branch(record.id, "decayed_below_threshold").await?;
                report.archived += archived.len();
                archived_this_cycle.extend(archived);
                report.pruned_roots.push(record.id);
            }
        }

        info!(
            examined = report.examined,
            decayed = report.decayed,
            pruned = report.pruned_roots.len(),
            archived = report.archived,
            "Decay cycle completed"
        );
        Ok(report)
    }

    /// Archive `root` and everything reachable from it through outgoing
    /// edges. Returns the nodes that were archived by this call.
    pub async fn prune_branch(&self, root: NodeId, reason: &str) -> CortexResult<Vec<NodeId>> {
        let now = Utc::now();
        let mut archived = Vec::new();

        for id in self.repository.traverse_branch(root).await? {
            let Some(node) = self.repository.find_node(id).await? else {
                continue;
            };
            if node.archived || is_shared(node.label) {
                continue;
            }
            if node.label.is_memory() {
                self.update(
                    id,
                    [
                        ("pruned_reason", json!(reason)),
                        ("pruned_timestamp", json!(now)),
                    ],
                )
                .await?;
            }
            self.repository.archive_node(id).await?;
            archived.push(id);
        }

        warn!(root_id = %root, archived = archived.len(), reason, "Branch archived");
        self.event_bus.publish(CortexEvent::BranchArchived {
            root_id: root,
            archived_count: archived.len(),
            reason: reason.to_string(),
            timestamp: now,
        });
        Ok(archived)
    }

    /// Un-archive `root` and everything reachable from it
    pub async fn restore_branch(&self, root: NodeId) -> CortexResult<Vec<NodeId>> {
        let mut restored = Vec::new();

        for id in self.repository.traverse_branch(root).await? {
            let Some(node) = self.repository.find_node(id).await? else {
                continue;
            };
            if !node.archived || is_shared(node.label) {
                continue;
            }
            self.repository.restore_node(id).await?;
            if node.label.is_memory() {
                self.update(
                    id,
                    [("pruned_reason", Value::Null), ("pruned_timestamp", Value::Null)],
                )
                .await?;
            }
            restored.push(id);
        }

        info!(root_id = %root, restored = restored.len(), "Branch restored");
        self.event_bus.publish(CortexEvent::BranchRestored {
            root_id: root,
            restored_count: restored.len(),
            timestamp: Utc::now(),
        });
        Ok(restored)
    }

    /// Flag the strongest live core memories as resurfaced, best first
    pub async fn resurface_valuable_memories(&self, trigger: Option<&str>) -> CortexResult<Vec<NodeId>> {
        let nodes = self
            .repository
            .query_nodes(
                &NodeFilter::label(NodeLabel::CoreMemory),
                Some(&NodeSort::descending("relevance_score")),
                None,
            )
            .await?;

        let now = Utc::now();
        let mut resurfaced = Vec::new();
        for node in nodes {
            if resurfaced.len() >= self.config.resurface_limit {
                break;
            }
            let mut record = MemoryRecord::from_node(&node)?;
            if record.relevance_score.unwrap_or_default() < self.config.min_surface_score {
                continue;
            }

            record.resurfaced = true;
            record
                .audit_log
                .append_at("resurfaced", json!({ "trigger": trigger }), now);
            self.persist(&record).await?;

            self.event_bus.publish(CortexEvent::MemoryResurfaced {
                memory_id: record.id,
                trigger: trigger.map(str::to_string),
                timestamp: now,
            });
            resurfaced.push(record.id);
        }

        info!(count = resurfaced.len(), trigger = ?trigger, "Memories resurfaced");
        Ok(resurfaced)
    }

    /// Write every stored field of the record back to its node
    async fn persist(&self, record: &MemoryRecord) -> CortexResult<()> {
        self.repository
            .update_node(record.id, to_properties(record)?)
            .await?;
        Ok(())
    }

    async fn update<const N: usize>(&self, id: NodeId, fields: [(&str, Value); N]) -> CortexResult<()> {
        let properties: Properties = fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        self.repository.update_node(id, properties).await?;
        Ok(())
    }
}

/// Nodes the whole graph depends on; never archived as part of a branch
fn is_shared(label: NodeLabel) -> bool {
    matches!(
        label,
        NodeLabel::Value | NodeLabel::ValueSchema | NodeLabel::ValueSchemaAudit | NodeLabel::Agent
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vector::{Emotion, EmotionVector, Valence};
    use crate::infrastructure::{BroadcastEventBus, InMemoryGraphRepository};
    use chrono::Duration;

    struct Fixture {
        repo: Arc<InMemoryGraphRepository>,
        bus: Arc<BroadcastEventBus>,
        manager: MemoryLifecycleManager,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryGraphRepository::with_default_taxonomy());
        let bus = Arc::new(BroadcastEventBus::new(256));
        let manager = MemoryLifecycleManager::new(repo.clone(), bus.clone(), MemoryConfig::default());
        Fixture { repo, bus, manager }
    }

    async fn seed(repo: &InMemoryGraphRepository, label: NodeLabel, record: MemoryRecord) -> NodeId {
        repo.create_node(label, to_properties(&record).unwrap())
            .await
            .unwrap()
            .id
    }

    /// A record whose four signals all equal `signal`, so it scores `0.95 * signal`
    fn uniform(signal: f64) -> MemoryRecord {
        MemoryRecord {
            raw_text: "walked the coast path".into(),
            relevance_score: Some(signal),
            novelty_score: Some(signal),
            agent_alignment: Some(signal),
            emotion_vector: EmotionVector::from_scores([(Emotion::Joy, signal)]),
            ..MemoryRecord::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_unscored_event() {
        let f = fixture();
        let record = f
            .manager
            .ingest_event(NewEvent::new("first snow").with_topics(vec!["winter".into()]).pinned(true))
            .await
            .unwrap();
        assert_eq!(record.kind, MemoryKind::Event);
        assert!(record.relevance_score.is_none());
        assert!(record.user_pinned);
        assert_eq!(record.audit_log.entries()[0].action, "ingested");

        assert!(f.manager.ingest_event(NewEvent::new("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_high_score_promotes_with_provenance() {
        let f = fixture();
        let id = seed(&f.repo, NodeLabel::Event, uniform(0.9)).await;
        let context = EvaluationContext {
            rationale: Some("[a] worth keeping".into()),
            ..EvaluationContext::default()
        };

        let result = f.manager.evaluate_event(id, &context).await.unwrap();
        assert!((result.score - 0.855).abs() < 1e-9);
        assert_eq!(result.threshold, 0.85);
        let core_id = result.promoted.unwrap();

        let core = f.manager.load(core_id).await.unwrap();
        assert!(core.is_core());
        assert_eq!(core.source_event_id, Some(id));
        assert_eq!(core.causal_trace, vec![id]);
        assert_eq!(core.rationale.as_deref(), Some("[a] worth keeping"));
        assert_eq!(core.summary.as_deref(), Some("walked the coast path"));
        assert_eq!(core.audit_log.last().unwrap().action, "promoted");

        let event = f.manager.load(id).await.unwrap();
        assert!(event.promoted);
        assert!(event.decay_rate.is_some());

        let edges = f.repo.edges_from(core_id).await;
        assert_eq!(edges[0].edge_type, links::PROMOTED_FROM);
        assert_eq!(edges[0].to_node, id);
    }

    #[tokio::test]
    async fn test_each_evaluation_appends_an_audit_entry() {
        let f = fixture();
        let id = seed(&f.repo, NodeLabel::Event, uniform(0.5)).await;
        f.manager.evaluate_event(id, &EvaluationContext::default()).await.unwrap();
        f.manager.evaluate_event(id, &EvaluationContext::default()).await.unwrap();

        let record = f.manager.load(id).await.unwrap();
        let evaluated: Vec<_> = record
            .audit_log
            .entries()
            .iter()
            .filter(|e| e.action == "evaluated")
            .collect();
        assert_eq!(evaluated.len(), 2);
        assert!(evaluated[0].sequence < evaluated[1].sequence);
        assert_eq!(evaluated[0].details["threshold"], 0.85);
    }

    #[tokio::test]
    async fn test_emotion_tagging_creates_node() {
        let f = fixture();
        let record = MemoryRecord {
            emotion_vector: EmotionVector::from_scores([(Emotion::Anger, 0.8), (Emotion::Joy, 0.1)]),
            ..uniform(0.5)
        };
        let id = seed(&f.repo, NodeLabel::Event, record).await;
        let result = f.manager.evaluate_event(id, &EvaluationContext::default()).await.unwrap();

        let emotion_id = result.emotion_node.unwrap();
        let node = f.repo.find_node(emotion_id).await.unwrap().unwrap();
        assert_eq!(node.label, NodeLabel::Emotion);
        assert_eq!(node.get_str("type"), Some("anger"));
        assert_eq!(node.get_str("valence"), Some("negative"));

        let event = f.manager.load(id).await.unwrap();
        assert_eq!(event.emotion_tag, Some(Emotion::Anger));
        assert_eq!(event.emotion_valence, Some(Valence::Negative));

        // a second evaluation does not tag again
        let again = f.manager.evaluate_event(id, &EvaluationContext::default()).await.unwrap();
        assert!(again.emotion_node.is_none());
    }

    #[tokio::test]
    async fn test_low_score_prunes_on_evaluation() {
        let f = fixture();
        let id = seed(&f.repo, NodeLabel::Event, uniform(0.1)).await;
        let result = f.manager.evaluate_event(id, &EvaluationContext::default()).await.unwrap();
        assert!(result.pruned);

        let record = f.manager.load(id).await.unwrap();
        assert!(record.archived);
        assert_eq!(record.pruned_reason.as_deref(), Some("score_below_threshold"));

        let err = f.manager.evaluate_event(id, &EvaluationContext::default()).await;
        assert!(matches!(err, Err(CortexError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_decay_without_elapsed_time_is_a_no_op() {
        let f = fixture();
        let now = Utc::now();
        let record = MemoryRecord {
            relevance_score: Some(0.6),
            last_evaluated: Some(now - Duration::days(10)),
            ..MemoryRecord::default()
        };
        let id = seed(&f.repo, NodeLabel::Event, record).await;

        let first = f.manager.run_decay_cycle_at(now).await.unwrap();
        assert_eq!(first.decayed, 1);
        let after_first = f.manager.load(id).await.unwrap().relevance_score.unwrap();
        assert!((after_first - 0.6 * (-0.3f64).exp()).abs() < 1e-9);

        let second = f.manager.run_decay_cycle_at(now).await.unwrap();
        assert_eq!(second.decayed, 0);
        assert_eq!(f.manager.load(id).await.unwrap().relevance_score.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_decay_below_threshold_archives_branch_but_not_values() {
        let f = fixture();
        let now = Utc::now();
        let stale = MemoryRecord {
            relevance_score: Some(0.5),
            last_evaluated: Some(now - Duration::days(100)),
            ..MemoryRecord::default()
        };
        let root = seed(&f.repo, NodeLabel::Event, stale).await;
        let child = seed(&f.repo, NodeLabel::Event, MemoryRecord::default()).await;
        let value = f.repo.create_node(NodeLabel::Value, Properties::new()).await.unwrap().id;
        f.repo
            .create_relationship(root, child, "RELATED_TO", Properties::new())
            .await
            .unwrap();
        f.repo
            .create_relationship(root, value, "EXPRESSES", Properties::new())
            .await
            .unwrap();

        let report = f.manager.run_decay_cycle_at(now).await.unwrap();
        assert_eq!(report.pruned_roots, vec![root]);
        assert_eq!(report.archived, 2);

        assert!(f.manager.load(child).await.unwrap().archived);
        assert_eq!(
            f.manager.load(root).await.unwrap().pruned_reason.as_deref(),
            Some("decayed_below_threshold")
        );
        assert!(!f.repo.find_node(value).await.unwrap().unwrap().archived);

        let restored = f.manager.restore_branch(root).await.unwrap();
        assert_eq!(restored.len(), 2);
        let root_record = f.manager.load(root).await.unwrap();
        assert!(!root_record.archived);
        assert!(root_record.pruned_reason.is_none());
    }

    #[tokio::test]
    async fn test_resurfacing_selects_strong_core_memories() {
        let f = fixture();
        let mut ids = Vec::new();
        for score in [0.9, 0.4, 0.7] {
            let record = MemoryRecord {
                kind: MemoryKind::CoreMemory,
                relevance_score: Some(score),
                ..MemoryRecord::default()
            };
            ids.push(seed(&f.repo, NodeLabel::CoreMemory, record).await);
        }
        let mut receiver = f.bus.subscribe();

        let surfaced = f.manager.resurface_valuable_memories(Some("anniversary")).await.unwrap();
        assert_eq!(surfaced, vec![ids[0], ids[2]]);

        let record = f.manager.load(ids[0]).await.unwrap();
        assert!(record.resurfaced);
        assert_eq!(record.audit_log.last().unwrap().details["trigger"], "anniversary");
        assert!(!f.manager.load(ids[1]).await.unwrap().resurfaced);
        assert_eq!(receiver.drain().len(), 2);
    }
}
