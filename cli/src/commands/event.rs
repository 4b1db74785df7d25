// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event ingestion
//!
//! Commands: ingest, process, show

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use ecodia_cortex::application::{PipelineStatus, ProcessOutcome};
use ecodia_cortex::{EvaluationContext, NodeId};

use super::{load_config, parse_node_id};
use crate::engine::{Engine, Wiring};

#[derive(Subcommand)]
pub enum EventCommand {
    /// Record an event and run it through the agent mesh
    Ingest {
        /// Raw event text
        text: String,

        /// Topic tag (repeatable)
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// Pin the event against decay
        #[arg(long)]
        pinned: bool,

        /// Only record the event, skip the agent mesh
        #[arg(long)]
        no_process: bool,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Run an existing event through the agent mesh again
    Process {
        id: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Print a stored event or core memory
    Show { id: String },
}

#[derive(Args)]
pub struct ContextArgs {
    /// Theme currently in focus; boosts matching topics
    #[arg(long)]
    theme: Option<String>,

    /// Novelty signal in [0, 1]
    #[arg(long)]
    novelty: Option<f64>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

impl ContextArgs {
    fn evaluation_context(&self) -> EvaluationContext {
        EvaluationContext {
            active_theme: self.theme.clone(),
            novelty: self.novelty,
            ..EvaluationContext::default()
        }
    }
}

pub async fn handle_command(
    command: EventCommand,
    config_path: Option<PathBuf>,
    store: PathBuf,
) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        EventCommand::Ingest {
            text,
            topics,
            pinned,
            no_process,
            context,
        } => {
            let wiring = if no_process {
                Wiring::Offline
            } else {
                Wiring::WithAgents
            };
            let engine = Engine::open(config, store, wiring).await?;
            let event = engine
                .pipeline
                .ingest_event(&text, topics, pinned)
                .await
                .context("Failed to ingest event")?;
            println!("{} {}", "✓ Event recorded:".green(), event.id);

            if !no_process {
                process(&engine, event.id, &context).await?;
            }
            engine.save().await
        }
        EventCommand::Process { id, context } => {
            let id = parse_node_id(&id)?;
            let engine = Engine::open(config, store, Wiring::WithAgents).await?;
            process(&engine, id, &context).await?;
            engine.save().await
        }
        EventCommand::Show { id } => {
            let id = parse_node_id(&id)?;
            let engine = Engine::open(config, store, Wiring::Offline).await?;
            let record = engine
                .pipeline
                .lifecycle()
                .load(id)
                .await
                .with_context(|| format!("Failed to load {}", id))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

async fn process(engine: &Engine, id: NodeId, context: &ContextArgs) -> Result<()> {
    let outcome = engine
        .pipeline
        .process_event(id, context.evaluation_context())
        .await
        .with_context(|| format!("Failed to process event {}", id))?;

    if context.json {
        println!("{}", serde_json::to_string_pretty(&Summary::from(&outcome))?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

/// Machine-readable view of one pipeline run
#[derive(Serialize)]
struct Summary {
    event_id: NodeId,
    status: PipelineStatus,
    agents: Vec<AgentLine>,
    conflict_axes: Vec<String>,
    consensus_score: Option<f64>,
    node_id: Option<NodeId>,
    score: f64,
    threshold: f64,
    promoted: Option<NodeId>,
    pruned: bool,
    mesh_edges: usize,
}

#[derive(Serialize)]
struct AgentLine {
    name: String,
    score: f64,
    error: Option<String>,
}

impl From<&ProcessOutcome> for Summary {
    fn from(outcome: &ProcessOutcome) -> Self {
        Self {
            event_id: outcome.event_id,
            status: outcome.pipeline.status,
            agents: outcome
                .responses
                .iter()
                .map(|r| AgentLine {
                    name: r.agent_name.clone(),
                    score: r.score,
                    error: r.error.clone(),
                })
                .collect(),
            conflict_axes: outcome.pipeline.conflict.conflict_axes.clone(),
            consensus_score: outcome.pipeline.consensus.as_ref().map(|c| c.consensus_score),
            node_id: outcome.pipeline.node_id(),
            score: outcome.evaluation.score,
            threshold: outcome.evaluation.threshold,
            promoted: outcome.evaluation.promoted,
            pruned: outcome.evaluation.pruned,
            mesh_edges: outcome.mesh.as_ref().map(|m| m.edges_created()).unwrap_or(0),
        }
    }
}

fn print_outcome(outcome: &ProcessOutcome) {
    println!();
    println!("{}", "Agents:".bold());
    if outcome.responses.is_empty() {
        println!("  {}", "(none registered)".dimmed());
    }
    for response in &outcome.responses {
        match &response.error {
            Some(error) => println!("  {:<16} {}", response.agent_name, error.red()),
            None => println!(
                "  {:<16} {:.2}  {}",
                response.agent_name, response.score, response.rationale
            ),
        }
    }
    println!();

    let status = outcome.pipeline.status.to_string();
    let status = match outcome.pipeline.status {
        PipelineStatus::Consensus | PipelineStatus::ReviewResolved => status.green(),
        PipelineStatus::PendingReview => status.yellow(),
        PipelineStatus::NoResponses => status.red(),
    };
    println!("{} {}", "Status:".bold(), status);
    if !outcome.pipeline.conflict.triggers.is_empty() {
        let triggers: Vec<String> = outcome
            .pipeline
            .conflict
            .triggers
            .iter()
            .map(|t| t.to_string())
            .collect();
        println!("  Conflict: {}", triggers.join(", "));
    }
    if let Some(review) = &outcome.pipeline.review {
        let dissent = review.peer_review.dissenting_agents();
        if !dissent.is_empty() {
            println!("  Dissenting: {}", dissent.join(", "));
        }
    }
    if let Some(consensus) = &outcome.pipeline.consensus {
        println!("  Consensus score: {:.3}", consensus.consensus_score);
    }
    if let Some(plan) = outcome.pipeline.action_plan() {
        println!("  Proposed action: {}", plan.action_type);
    }
    println!();

    let evaluation = &outcome.evaluation;
    println!(
        "{} {:.3} (threshold {:.3})",
        "Evaluation:".bold(),
        evaluation.score,
        evaluation.threshold
    );
    if let Some(core) = evaluation.promoted {
        println!("  {} {}", "Promoted to core memory".green(), core);
    }
    if evaluation.pruned {
        println!("  {}", "Score at prune threshold, branch archived".yellow());
    }
    if let Some(mesh) = &outcome.mesh {
        println!("  Mesh edges created: {}", mesh.edges_created());
    }
}
