//! Event types and the broadcast bus
//!
//! Events are broadcast via EventBus and serialized for SSE transmission.
//! Every event names the user it belongs to so streams can be filtered per
//! session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// VetTrack event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum VetEvent {
    /// A reminder passed its due date without being completed
    ReminderDue {
        reminder_id: i64,
        pet_id: i64,
        user_id: i64,
        pet_name: String,
        title: String,
        due_date: DateTime<Utc>,
    },

    /// A symptom or photo analysis was stored in the health history
    AnalysisRecorded {
        entry_id: i64,
        pet_id: i64,
        user_id: i64,
        urgency_level: String,
        timestamp: DateTime<Utc>,
    },
}

impl VetEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            VetEvent::ReminderDue { .. } => "ReminderDue",
            VetEvent::AnalysisRecorded { .. } => "AnalysisRecorded",
        }
    }

    /// Owner of the record the event refers to
    pub fn user_id(&self) -> i64 {
        match self {
            VetEvent::ReminderDue { user_id, .. } => *user_id,
            VetEvent::AnalysisRecorded { user_id, .. } => *user_id,
        }
    }
}

/// Broadcast bus shared by handlers, background tasks and SSE streams
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VetEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<VetEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: VetEvent) -> Result<usize, broadcast::error::SendError<VetEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: VetEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
