//! Conflict event broadcaster.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Something the conflict detector did (or failed to do) after a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictEvent {
    /// A candidate item overlaps a foreign booking.
    Detected {
        project_id: String,
        candidate_title: String,
        foreign_item_id: String,
        foreign_project_id: String,
        worker_ids: Vec<String>,
    },
    /// The foreign item was flagged.
    Flagged { foreign_item_id: String },
    /// The foreign project's owner was notified.
    Notified {
        recipient_id: String,
        notification_id: String,
    },
    /// A best-effort step failed; the save itself was not affected.
    Failed {
        foreign_item_id: String,
        step: String,
        error: String,
    },
}

/// Envelope with the time the event was published.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampedConflictEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ConflictEvent,
}

#[derive(Clone)]
pub struct ConflictBroadcaster {
    sender: broadcast::Sender<StampedConflictEvent>,
}

impl ConflictBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn send(&self, event: ConflictEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(StampedConflictEvent {
            timestamp: Utc::now(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StampedConflictEvent> {
        self.sender.subscribe()
    }
}

impl Default for ConflictBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
