use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use super::EntryId;

/// Envelope around a caller payload.
///
/// The id is assigned at enqueue and stays stable across retries;
/// `attempts` counts deliveries, not enqueues, so it is 0 until the entry
/// is first dequeued.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    /// Unique entry identifier, stable across retries
    pub id: EntryId,

    /// Caller-supplied payload
    pub payload: T,

    /// Number of deliveries so far (incremented on every dequeue)
    pub attempts: u32,

    /// When the entry was most recently dequeued (None before first dequeue)
    pub dequeued_at: Option<DateTime<Utc>>,
}

impl<T> Entry<T> {
    /// Create a fresh entry for enqueue
    pub fn new(id: EntryId, payload: T) -> Self {
        Self {
            id,
            payload,
            attempts: 0,
            dequeued_at: None,
        }
    }

    /// Mark one delivery: stamp `dequeued_at` and bump `attempts`
    pub(crate) fn record_dequeue(&mut self, now: DateTime<Utc>) {
        self.dequeued_at = Some(now);
        self.attempts += 1;
    }

    /// The instant this delivery must be settled by, given a visibility
    /// timeout. None before the first dequeue.
    pub fn visibility_deadline(&self, timeout: Duration) -> Option<DateTime<Utc>> {
        let budget = ChronoDuration::from_std(timeout).ok()?;
        self.dequeued_at.and_then(|at| at.checked_add_signed(budget))
    }

    /// Whether this delivery has outlived the visibility timeout
    pub fn visibility_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        matches!(self.visibility_deadline(timeout), Some(deadline) if deadline < now)
    }
}
