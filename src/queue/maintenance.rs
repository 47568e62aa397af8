//! Visibility-timeout enforcement.
//!
//! One re-armable timer per queue, always aimed at the earliest pending
//! visibility deadline. Scheduler pressure stays O(1) in the number of
//! in-flight entries; the scan itself is O(n) but amortized over one
//! wakeup per expiry batch.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::QueueError;
use crate::queue::QueueCore;

/// The queue's single pending maintenance timer, if any
pub(crate) struct MaintenanceSlot {
    /// Deadline the pending task will fire at
    pub next_at: Option<DateTime<Utc>>,

    /// The pending task itself
    pub task: Option<JoinHandle<()>>,
}

impl MaintenanceSlot {
    pub fn new() -> Self {
        Self {
            next_at: None,
            task: None,
        }
    }
}

impl<T> QueueCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Aim the maintenance timer at `deadline`.
    ///
    /// A pending timer with an earlier deadline is left alone; a later one
    /// is replaced. Arming is serialized by the slot mutex.
    pub(crate) fn arm_maintenance(core: &Arc<Self>, deadline: DateTime<Utc>) {
        if core.disposed.load(Ordering::Relaxed) {
            return;
        }

        let mut slot = core.maintenance.lock();
        if let Some(next_at) = slot.next_at {
            if next_at <= deadline {
                return;
            }
        }
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.next_at = Some(deadline);

        let task_core = Arc::clone(core);
        slot.task = Some(tokio::spawn(async move {
            let wait = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
            Self::run_maintenance(&task_core);
        }));
    }

    /// One maintenance pass: scan in-flight once, re-arm to the earliest
    /// surviving deadline, then reclaim the expired entries.
    ///
    /// Re-arming before abandoning bounds the time to the next pass
    /// independently of how many reclaims fire below.
    pub(crate) fn run_maintenance(core: &Arc<Self>) {
        {
            let mut slot = core.maintenance.lock();
            slot.next_at = None;
            slot.task = None;
        }

        let now = Utc::now();
        let timeout = core.config.visibility_timeout;
        let mut expired = Vec::new();
        let mut min_deadline: Option<DateTime<Utc>> = None;
        {
            let state = core.state.lock();
            for entry in state.in_flight.values() {
                if entry.visibility_expired(timeout, now) {
                    expired.push(entry.id.clone());
                } else if let Some(deadline) = entry.visibility_deadline(timeout) {
                    min_deadline = Some(min_deadline.map_or(deadline, |m| m.min(deadline)));
                }
            }
        }

        if let Some(deadline) = min_deadline {
            Self::arm_maintenance(core, deadline);
        }

        if expired.is_empty() {
            debug!(queue_id = %core.queue_id, "maintenance pass found no expired deliveries");
            return;
        }

        let mut reclaimed = 0usize;
        for id in expired {
            match Self::settle_abandon(core, &id) {
                Ok(()) => {
                    core.counters.worker_timeouts.fetch_add(1, Ordering::Relaxed);
                    core.emit(crate::types::QueueEvent::TimedOut {
                        entry_id: id,
                        at: now,
                    });
                    reclaimed += 1;
                }
                // the consumer settled it in the race window; nothing to do
                Err(QueueError::NotInFlight(_)) => {
                    debug!(entry_id = %id, "expired delivery settled before reclaim");
                }
                Err(err) => {
                    debug!(entry_id = %id, error = %err, "failed to reclaim expired delivery");
                }
            }
        }
        if reclaimed > 0 {
            info!(queue_id = %core.queue_id, reclaimed, "reclaimed expired deliveries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::queue::WorkQueue;

    #[tokio::test]
    async fn reclaim_moves_expired_delivery_to_retry() {
        let q: WorkQueue<&'static str> = WorkQueue::with_config(
            QueueConfig::new()
                .with_retry_limit(1)
                .with_retry_delay(Duration::ZERO)
                .with_visibility_timeout(Duration::from_millis(40)),
        );

        q.enqueue("slow").await.unwrap();
        let delivery = q.dequeue_timeout(Duration::ZERO).await.unwrap().unwrap();
        drop(delivery); // consumer goes silent

        // the timer armed at dequeue fires and requeues the entry
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(q.in_flight_count(), 0);
        assert_eq!(q.ready_count(), 1);
        assert_eq!(q.worker_timeout_count(), 1);
        assert_eq!(q.abandoned_count(), 1);
    }

    #[tokio::test]
    async fn keeps_earlier_deadline_when_rearmed_later() {
        let q: WorkQueue<u32> = WorkQueue::with_config(
            QueueConfig::new().with_visibility_timeout(Duration::from_secs(60)),
        );
        let core = q.core();

        let soon = Utc::now() + chrono::Duration::seconds(1);
        let later = Utc::now() + chrono::Duration::seconds(30);

        QueueCore::arm_maintenance(core, soon);
        QueueCore::arm_maintenance(core, later);
        assert_eq!(core.maintenance.lock().next_at, Some(soon));

        let sooner = Utc::now() + chrono::Duration::milliseconds(100);
        QueueCore::arm_maintenance(core, sooner);
        assert_eq!(core.maintenance.lock().next_at, Some(sooner));
    }
}
