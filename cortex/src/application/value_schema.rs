// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Value Schema Registry
//!
//! Owns the versioned pool of value axes. Axes live in the graph as `Value`
//! nodes, the current version as a single `ValueSchema` node, and every
//! mutation as a `ValueSchemaAudit` node whose `sequence` is the version the
//! mutation produced.
//!
//! Reads are served from an in-process cache. Every mutating call first
//! reloads the pool from the graph (read-through), applies its change, writes
//! it back and replaces the cache. Concurrent writers race last-writer-wins on
//! the cache, but each writes its own audit record.

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::errors::{CortexError, CortexResult};
use crate::domain::events::{CortexEvent, EventBus};
use crate::domain::graph::{to_properties, NodeFilter, NodeLabel, NodeSort, Properties};
use crate::domain::repository::GraphRepository;
use crate::domain::value::{AxisEdit, SchemaAction, SchemaAuditRecord, ValueAxis, ValueSchema};
use crate::domain::vector::{clamp_unit, SchemaVersion};

pub struct ValueSchemaRegistry {
    repository: Arc<dyn GraphRepository>,
    event_bus: Arc<dyn EventBus>,
    cache: RwLock<Option<ValueSchema>>,
}

impl ValueSchemaRegistry {
    pub fn new(repository: Arc<dyn GraphRepository>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            repository,
            event_bus,
            cache: RwLock::new(None),
        }
    }

    /// Current axes and version
    pub async fn get_pool(&self) -> CortexResult<ValueSchema> {
        if let Some(schema) = self.cache.read().clone() {
            return Ok(schema);
        }
        self.refresh().await
    }

    /// Reload the pool from the graph and replace the cache
    pub async fn refresh(&self) -> CortexResult<ValueSchema> {
        let version = self.load_version().await?;
        let nodes = self
            .repository
            .query_nodes(
                &NodeFilter::label(NodeLabel::Value).including_archived(),
                Some(&NodeSort::ascending("created_at")),
                None,
            )
            .await?;

        let axes = nodes
            .iter()
            .map(ValueAxis::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        let schema = ValueSchema { version, axes };
        *self.cache.write() = Some(schema.clone());
        debug!(version = %schema.version, axes = schema.axes.len(), "Value schema loaded");
        Ok(schema)
    }

    pub async fn add_axis(&self, actor: &str, axis: ValueAxis) -> CortexResult<ValueAxis> {
        let name = axis.name.trim().to_string();
        if name.is_empty() {
            return Err(CortexError::InvalidInput("axis name cannot be empty".into()));
        }

        let current = self.refresh().await?;
        if current.is_known(&name) {
            return Err(CortexError::InvalidInput(format!(
                "an active axis named '{}' already exists",
                name
            )));
        }

        let mut axis = ValueAxis {
            name,
            created_by: actor.to_string(),
            created_at: Utc::now(),
            ..axis
        };
        axis.set_importance(axis.importance);
        if axis.label.is_empty() {
            axis.label = axis.name.clone();
        }

        let node = self
            .repository
            .create_node(NodeLabel::Value, to_properties(&axis)?)
            .await?;
        axis.id = node.id;
        // persist the authoritative id alongside the other fields
        self.write_axis(&axis).await?;

        let mut new_pool = current.axes.clone();
        new_pool.push(axis.clone());
        let note = format!("added axis '{}'", axis.name);
        self.commit(actor, SchemaAction::AddAxis, &note, current, new_pool)
            .await?;
        Ok(axis)
    }

    /// Soft delete: the axis is deactivated, never removed
    pub async fn remove_axis(&self, actor: &str, name: &str) -> CortexResult<()> {
        let current = self.refresh().await?;
        let mut new_pool = current.axes.clone();
        let axis = Self::find_active_mut(&mut new_pool, name)?;
        axis.active = false;
        let axis = axis.clone();

        self.write_axis(&axis).await?;
        let note = format!("deactivated axis '{}'", name);
        self.commit(actor, SchemaAction::RemoveAxis, &note, current, new_pool)
            .await?;
        Ok(())
    }

    pub async fn edit_axis(&self, actor: &str, name: &str, edit: AxisEdit) -> CortexResult<ValueAxis> {
        if edit.is_empty() {
            return Err(CortexError::InvalidInput("edit changes nothing".into()));
        }

        let current = self.refresh().await?;
        if let Some(new_name) = &edit.name {
            if new_name != name && current.is_known(new_name) {
                return Err(CortexError::InvalidInput(format!(
                    "an active axis named '{}' already exists",
                    new_name
                )));
            }
        }

        let mut new_pool = current.axes.clone();
        let axis = Self::find_active_mut(&mut new_pool, name)?;
        if let Some(new_name) = edit.name {
            axis.name = new_name;
        }
        if let Some(label) = edit.label {
            axis.label = label;
        }
        if let Some(description) = edit.description {
            axis.description = description;
        }
        let axis = axis.clone();

        self.write_axis(&axis).await?;
        let note = format!("edited axis '{}'", name);
        self.commit(actor, SchemaAction::EditAxis, &note, current, new_pool)
            .await?;
        Ok(axis)
    }

    /// Set an axis importance, clamped to `[0, 1]`. Returns the stored value.
    pub async fn set_importance(&self, actor: &str, name: &str, importance: f64) -> CortexResult<f64> {
        let current = self.refresh().await?;
        let mut new_pool = current.axes.clone();
        let axis = Self::find_active_mut(&mut new_pool, name)?;
        axis.set_importance(importance);
        let axis = axis.clone();

        self.write_axis(&axis).await?;
        let note = format!("importance of '{}' set to {:.4}", name, axis.importance);
        self.commit(actor, SchemaAction::SetImportance, &note, current, new_pool)
            .await?;
        Ok(axis.importance)
    }

    /// Multiply every active importance by `1 - rate`, never going below `floor`
    pub async fn decay_all_importance(&self, rate: f64, floor: f64) -> CortexResult<SchemaVersion> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(CortexError::InvalidInput(format!("decay rate {} outside [0, 1]", rate)));
        }
        if floor <= 0.0 || floor > 1.0 {
            return Err(CortexError::InvalidInput(format!("importance floor {} outside (0, 1]", floor)));
        }

        let current = self.refresh().await?;
        let mut new_pool = current.axes.clone();
        for axis in new_pool.iter_mut().filter(|a| a.active) {
            let decayed = (axis.importance * (1.0 - rate)).max(floor);
            // an axis already below the floor is left alone, not raised
            if decayed < axis.importance {
                axis.set_importance(decayed);
                self.write_axis(axis).await?;
            }
        }

        let note = format!("decayed importance by {:.4} (floor {:.4})", rate, floor);
        self.commit("system", SchemaAction::DecayImportance, &note, current, new_pool)
            .await
    }

    /// Raise an axis importance by `amount`, saturating at `cap`. Returns the stored value.
    pub async fn bump_importance(&self, name: &str, amount: f64, cap: f64) -> CortexResult<f64> {
        let current = self.refresh().await?;
        let mut new_pool = current.axes.clone();
        let axis = Self::find_active_mut(&mut new_pool, name)?;
        axis.set_importance((axis.importance + amount.max(0.0)).min(clamp_unit(cap)));
        let axis = axis.clone();

        self.write_axis(&axis).await?;
        let note = format!("bumped '{}' to {:.4}", name, axis.importance);
        self.commit("consensus", SchemaAction::BumpImportance, &note, current, new_pool)
            .await?;
        Ok(axis.importance)
    }

    /// Deactivate every axis in a single audited mutation
    pub async fn reset_to_blank_slate(&self, actor: &str, note: &str) -> CortexResult<SchemaVersion> {
        let current = self.refresh().await?;
        let mut new_pool = current.axes.clone();
        for axis in new_pool.iter_mut().filter(|a| a.active) {
            axis.active = false;
            self.write_axis(axis).await?;
        }

        self.commit(actor, SchemaAction::ResetBlankSlate, note, current, new_pool)
            .await
    }

    /// Most recent `limit` audit records, oldest first
    pub async fn audit_log(&self, limit: usize) -> CortexResult<Vec<SchemaAuditRecord>> {
        let nodes = self
            .repository
            .query_nodes(
                &NodeFilter::label(NodeLabel::ValueSchemaAudit).including_archived(),
                Some(&NodeSort::descending("sequence")),
                Some(limit),
            )
            .await?;

        let mut records = nodes
            .iter()
            .map(|node| node.decode::<SchemaAuditRecord>())
            .collect::<Result<Vec<_>, _>>()?;
        records.reverse();
        Ok(records)
    }

    fn find_active_mut<'a>(pool: &'a mut [ValueAxis], name: &str) -> CortexResult<&'a mut ValueAxis> {
        pool.iter_mut()
            .find(|axis| axis.active && axis.name == name)
            .ok_or_else(|| CortexError::InvalidInput(format!("no active axis named '{}'", name)))
    }

    async fn write_axis(&self, axis: &ValueAxis) -> CortexResult<()> {
        self.repository
            .update_node(axis.id, to_properties(axis)?)
            .await?;
        Ok(())
    }

    async fn load_version(&self) -> CortexResult<SchemaVersion> {
        let nodes = self
            .repository
            .query_nodes(
                &NodeFilter::label(NodeLabel::ValueSchema).including_archived(),
                None,
                Some(1),
            )
            .await?;
        Ok(nodes
            .first()
            .and_then(|node| node.get("version").and_then(|v| v.as_u64()))
            .map(SchemaVersion)
            .unwrap_or_default())
    }

    async fn store_version(&self, version: SchemaVersion) -> CortexResult<()> {
        let mut properties = Properties::new();
        properties.insert("version".into(), json!(version.0));
        properties.insert("updated_at".into(), json!(Utc::now()));

        let existing = self
            .repository
            .query_nodes(
                &NodeFilter::label(NodeLabel::ValueSchema).including_archived(),
                None,
                Some(1),
            )
            .await?;
        match existing.first() {
            Some(node) => {
                self.repository.update_node(node.id, properties).await?;
            }
            None => {
                self.repository
                    .create_node(NodeLabel::ValueSchema, properties)
                    .await?;
            }
        }
        Ok(())
    }

    /// Bump the version, append the audit record and replace the cache
    async fn commit(
        &self,
        actor: &str,
        action: SchemaAction,
        note: &str,
        old: ValueSchema,
        new_pool: Vec<ValueAxis>,
    ) -> CortexResult<SchemaVersion> {
        let version = old.version.next();
        let record = SchemaAuditRecord {
            sequence: version.0,
            actor: actor.to_string(),
            action,
            note: note.to_string(),
            old_pool: old.axes,
            new_pool: new_pool.clone(),
            timestamp: Utc::now(),
        };

        self.store_version(version).await?;
        self.repository
            .create_node(NodeLabel::ValueSchemaAudit, to_properties(&record)?)
            .await?;

        *self.cache.write() = Some(ValueSchema {
            version,
            axes: new_pool,
        });

        info!(%version, %action, actor, note, "Value schema changed");
        self.event_bus.publish(CortexEvent::SchemaChanged {
            version,
            action,
            actor: actor.to_string(),
            timestamp: record.timestamp,
        });
        Ok(version)
    }
}
