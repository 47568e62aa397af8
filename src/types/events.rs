use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntryId;

/// Minimal stable event protocol for observability.
///
/// Published on a lossy broadcast channel; subscribers that fall behind
/// miss events rather than slowing the queue down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueEvent {
    /// Entry was accepted onto the ready list
    Enqueued {
        entry_id: EntryId,
        at: DateTime<Utc>,
    },

    /// Entry was delivered to a consumer
    Dequeued {
        entry_id: EntryId,
        attempt: u32,
        at: DateTime<Utc>,
    },

    /// Entry was completed and destroyed
    Completed {
        entry_id: EntryId,
        at: DateTime<Utc>,
    },

    /// Entry was abandoned with retry budget left; it re-enters the ready
    /// list at `retry_at`
    RetryScheduled {
        entry_id: EntryId,
        attempt: u32,
        retry_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },

    /// Entry exhausted its retry budget
    DeadLettered {
        entry_id: EntryId,
        attempts: u32,
        at: DateTime<Utc>,
    },

    /// Entry overran its visibility timeout and was reclaimed
    TimedOut {
        entry_id: EntryId,
        at: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Dequeued { .. } => "dequeued",
            Self::Completed { .. } => "completed",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::DeadLettered { .. } => "dead_lettered",
            Self::TimedOut { .. } => "timed_out",
        }
    }

    /// Get the entry ID from any event
    pub fn entry_id(&self) -> &EntryId {
        match self {
            Self::Enqueued { entry_id, .. } => entry_id,
            Self::Dequeued { entry_id, .. } => entry_id,
            Self::Completed { entry_id, .. } => entry_id,
            Self::RetryScheduled { entry_id, .. } => entry_id,
            Self::DeadLettered { entry_id, .. } => entry_id,
            Self::TimedOut { entry_id, .. } => entry_id,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Enqueued { at, .. } => at,
            Self::Dequeued { at, .. } => at,
            Self::Completed { at, .. } => at,
            Self::RetryScheduled { at, .. } => at,
            Self::DeadLettered { at, .. } => at,
            Self::TimedOut { at, .. } => at,
        }
    }
}
