// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for cortex domain events
//
// In-memory streaming over a tokio broadcast channel. Subscribers that fall
// behind lose the oldest events; nothing is persisted here. The durable
// record of every mutation is the audit log stored on the nodes themselves.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::{CortexEvent, EventBus};

#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: Arc<broadcast::Sender<CortexEvent>>,
}

impl BroadcastEventBus {
    /// Capacity is how many events are buffered before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, event: CortexEvent) {
        debug!(event_type = event.event_type(), "Publishing cortex event");
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<CortexEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<CortexEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Event receiver lagged, missed {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<CortexEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged, missed {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Drain everything currently buffered
    pub fn drain(&mut self) -> Vec<CortexEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus closed")]
    Closed,

    #[error("Receiver lagged, missed {0} events")]
    Lagged(u64),

    #[error("No events available")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::NodeId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = BroadcastEventBus::new(8);
        bus.publish(CortexEvent::MeshLinked {
            event_id: NodeId::new(),
            edges_created: 0,
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = BroadcastEventBus::new(8);
        let mut receiver = bus.subscribe();

        for edges_created in 0..3 {
            bus.publish(CortexEvent::MeshLinked {
                event_id: NodeId::new(),
                edges_created,
                timestamp: Utc::now(),
            });
        }

        let first = receiver.recv().await.unwrap();
        assert!(matches!(first, CortexEvent::MeshLinked { edges_created: 0, .. }));

        let rest = receiver.drain();
        assert_eq!(rest.len(), 2);
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }
}
