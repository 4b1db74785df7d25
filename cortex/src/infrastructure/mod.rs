// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer for the cortex bounded context

pub mod event_bus;
pub mod graph_store;
pub mod llm;

pub use event_bus::{BroadcastEventBus, EventBusError, EventReceiver};
pub use graph_store::{GraphSnapshot, InMemoryGraphRepository, DEFAULT_LINK_TYPES};
pub use llm::{GatewayRegistry, OllamaAdapter, OpenAIAdapter};
