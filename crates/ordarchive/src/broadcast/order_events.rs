//! Order change broadcaster: listing views subscribe and refresh on events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    Updated,
    Deleted,
}

impl std::fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventKind::Created => write!(f, "created"),
            OrderEventKind::Updated => write!(f, "updated"),
            OrderEventKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// One committed change to the archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_id: String,
    /// Order number at the time of the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(kind: OrderEventKind, order_id: &str, order_number: Option<&str>) -> Self {
        Self {
            kind,
            order_id: order_id.to_string(),
            order_number: order_number.map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct OrderEventBroadcaster {
    sender: Arc<broadcast::Sender<OrderEvent>>,
}

impl OrderEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: OrderEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for OrderEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
