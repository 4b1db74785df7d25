// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Ecodia Cortex
//!
//! Cognitive consensus and memory lifecycle engine. Events are scored against
//! a versioned value schema by a mesh of reasoning agents, their outputs are
//! fused (or escalated to peer review when they diverge), and the resulting
//! memories are promoted, decayed, pruned and linked into the graph over time.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Domain:** value schema, vectors, agent responses, consensus, peer review,
//!   memory records, graph model, configuration
//! - **Application:** the seven engine components, the agent mesh, the
//!   pipeline facade and the background maintenance task
//! - **Infrastructure:** in-memory graph store, broadcast event bus, language
//!   model adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::*;
