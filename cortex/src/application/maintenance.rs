// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Maintenance Task - background decay, resurfacing and importance decay
//!
//! The engine's "sleep cycle". Each tick runs, in order:
//!
//! 1. the memory decay cycle (archiving branches that fall below the prune threshold)
//! 2. resurfacing of valuable core memories
//! 3. the value schema importance decay
//!
//! and then publishes `MaintenanceCycleCompleted`. A failed tick is logged and
//! the loop carries on.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::config::{MaintenanceConfig, SchemaConfig};
use crate::domain::events::{CortexEvent, EventBus};

use super::memory_lifecycle::MemoryLifecycleManager;
use super::value_schema::ValueSchemaRegistry;

/// Counts from one maintenance tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub decayed: usize,
    pub archived: usize,
    pub resurfaced: usize,
}

pub struct MaintenanceTask {
    lifecycle: Arc<MemoryLifecycleManager>,
    registry: Arc<ValueSchemaRegistry>,
    event_bus: Arc<dyn EventBus>,
    config: MaintenanceConfig,
    schema_config: SchemaConfig,
    shutdown_token: CancellationToken,
}

impl MaintenanceTask {
    pub fn new(
        lifecycle: Arc<MemoryLifecycleManager>,
        registry: Arc<ValueSchemaRegistry>,
        event_bus: Arc<dyn EventBus>,
        config: MaintenanceConfig,
        schema_config: SchemaConfig,
    ) -> Self {
        Self {
            lifecycle,
            registry,
            event_bus,
            config,
            schema_config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Maintenance task is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            "Starting maintenance background task"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds.max(1)));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running maintenance cycle");

                    match self.run_cycle().await {
                        Ok(report) => {
                            info!(
                                decayed = report.decayed,
                                archived = report.archived,
                                resurfaced = report.resurfaced,
                                "Maintenance cycle completed"
                            );
                        }
                        Err(e) => {
                            warn!("Maintenance cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping maintenance task");
                    break;
                }
            }
        }

        info!("Maintenance background task stopped");
    }

    /// Execute a single maintenance cycle
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let decay = self.lifecycle.run_decay_cycle().await?;
        let resurfaced = self
            .lifecycle
            .resurface_valuable_memories(Some("maintenance"))
            .await?;
        self.registry
            .decay_all_importance(
                self.schema_config.importance_decay_rate,
                self.schema_config.importance_floor,
            )
            .await?;

        let report = CycleReport {
            decayed: decay.decayed,
            archived: decay.archived,
            resurfaced: resurfaced.len(),
        };
        self.event_bus.publish(CortexEvent::MaintenanceCycleCompleted {
            decayed: report.decayed,
            archived: report.archived,
            resurfaced: report.resurfaced,
            timestamp: Utc::now(),
        });
        Ok(report)
    }
}
