//! Event system for record operations
//!
//! Provides an event bus for notifying listeners about storage operations.
//! Useful for:
//! - Audit logging
//! - Cache invalidation
//! - Export/report regeneration triggers

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::kind::EntityKind;

/// Storage events emitted by services
#[derive(Debug, Clone)]
pub enum StorageEvent {
    RecordCreated {
        kind: EntityKind,
        id: String,
        scope_id: String,
        code: String,
    },
    RecordUpdated {
        kind: EntityKind,
        id: String,
        version: String,
    },
    RecordDeleted {
        kind: EntityKind,
        id: String,
        code: String,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &StorageEvent);
}

/// Event bus for broadcasting storage events
pub struct EventBus {
    sender: broadcast::Sender<StorageEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: StorageEvent) {
        trace!(event = ?event, "Emitting storage event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &StorageEvent) {
        match event {
            StorageEvent::RecordCreated { kind, id, scope_id, code } => {
                info!(kind = %kind, id = %id, scope = %scope_id, code = %code, "Record created");
            }
            StorageEvent::RecordUpdated { kind, id, version } => {
                debug!(kind = %kind, id = %id, version = %version, "Record updated");
            }
            StorageEvent::RecordDeleted { kind, id, code } => {
                info!(kind = %kind, id = %id, code = %code, "Record deleted");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(StorageEvent::RecordCreated {
            kind: EntityKind::Actor,
            id: "actor-1".into(),
            scope_id: "project-1".into(),
            code: "ACT-0001".into(),
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            StorageEvent::RecordCreated { kind, code, .. } => {
                assert_eq!(kind, EntityKind::Actor);
                assert_eq!(code, "ACT-0001");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        // Should not panic even with no subscribers
        bus.emit(StorageEvent::RecordDeleted {
            kind: EntityKind::Risk,
            id: "risk-1".into(),
            code: "RISK-0001".into(),
        });
    }
}
