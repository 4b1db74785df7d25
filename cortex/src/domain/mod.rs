// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain layer for the cortex bounded context

pub mod agent;
pub mod config;
pub mod consensus;
pub mod errors;
pub mod events;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod repository;
pub mod review;
pub mod value;
pub mod vector;

pub use agent::*;
pub use config::*;
pub use consensus::*;
pub use errors::*;
pub use events::*;
pub use graph::*;
pub use llm::*;
pub use memory::*;
pub use repository::*;
pub use review::*;
pub use value::*;
pub use vector::*;
