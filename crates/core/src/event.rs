//! Domain event system: decoupled observation of routing activity.
//!
//! Events are published when something interesting happens in the router.
//! Observers (log shippers, dashboards, tests) subscribe without the router
//! knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A provider moved between healthy/degraded/dead
    ProviderHealthChanged {
        provider: String,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed inside the tool-calling loop
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A context source failed and the prompt fell back to the minimal form
    AugmentationDegraded {
        source_name: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// route() produced its outcome
    RouteCompleted {
        tier: String,
        provider: Option<String>,
        cached: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
