pub mod retry;

pub(crate) mod maintenance;
pub(crate) mod state;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, Notify};
use tracing::debug;
use uuid::Uuid;

use crate::codec::PayloadCodec;
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::hooks::{NoopHooks, QueueHooks};
use crate::metrics::{Counters, MetricsSink, QueueStats};
use crate::types::{Entry, EntryId, QueueEvent};
use maintenance::MaintenanceSlot;
use state::QueueState;

/// Wait budget for `dequeue()` when no explicit timeout is given
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// In-process typed work queue with at-least-once delivery.
///
/// Producers `enqueue` payloads; consumers `dequeue` them and settle each
/// delivery with `complete` or `abandon`. A delivery that is never settled
/// is reclaimed by the visibility timeout. Abandoned entries retry with
/// backoff until the retry budget runs out, then land on the dead-letter
/// list. Cloning the queue clones a handle to the same instance.
pub struct WorkQueue<T> {
    core: Arc<QueueCore<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a queue with default configuration
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Create a queue with custom configuration
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            core: Arc::new(QueueCore::new(config)),
        }
    }

    /// Install lifecycle hooks (builder form)
    pub fn with_hooks(self, hooks: Arc<dyn QueueHooks<T>>) -> Self {
        self.set_hooks(Some(hooks));
        self
    }

    /// Install a metrics sink (builder form)
    pub fn with_metrics(self, sink: Arc<dyn MetricsSink>) -> Self {
        *self.core.metrics.write() = Some(sink);
        self
    }

    /// Install a payload codec for deep copies (builder form)
    pub fn with_codec(self, codec: Arc<dyn PayloadCodec<T>>) -> Self {
        *self.core.codec.write() = Some(codec);
        self
    }

    /// Opaque identifier for this queue instance
    pub fn queue_id(&self) -> &str {
        &self.core.queue_id
    }

    /// Replace the lifecycle hooks. `None` reverts to the no-op hooks, so
    /// callers never observe a missing handler.
    pub fn set_hooks(&self, hooks: Option<Arc<dyn QueueHooks<T>>>) {
        *self.core.hooks.write() = hooks.unwrap_or_else(|| Arc::new(NoopHooks));
    }

    /// Get the current lifecycle hooks
    pub fn hooks(&self) -> Arc<dyn QueueHooks<T>> {
        self.core.hooks()
    }

    /// Subscribe to the lossy queue event stream
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.core.events.subscribe()
    }

    /// Enqueue a payload.
    ///
    /// Returns `Ok(None)` when the `before_enqueue` hook vetoes the
    /// payload; no state changes in that case. Fails only when a configured
    /// codec cannot round-trip the payload.
    pub async fn enqueue(&self, payload: T) -> QueueResult<Option<EntryId>> {
        let hooks = self.core.hooks();
        if !hooks.before_enqueue(&payload) {
            debug!(queue_id = %self.core.queue_id, "enqueue vetoed by hook");
            return Ok(None);
        }

        let id = EntryId::new();
        let stored = self.core.deep_copy(&payload)?;
        {
            let mut state = self.core.state.lock();
            state.ready.push_back(Entry::new(id.clone(), stored));
        }
        self.core.signal.notify_one();
        self.core.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        self.core.update_gauge();
        self.core.emit(QueueEvent::Enqueued {
            entry_id: id.clone(),
            at: Utc::now(),
        });
        hooks.after_enqueue(&id, &payload);
        Ok(Some(id))
    }

    /// Dequeue with the default 30 second wait
    pub async fn dequeue(&self) -> QueueResult<Option<Delivery<T>>> {
        self.dequeue_timeout(DEFAULT_DEQUEUE_TIMEOUT).await
    }

    /// Dequeue the next ready entry, waiting up to `timeout` for one to
    /// arrive. A zero timeout is a single non-blocking poll. Delivery order
    /// is FIFO under a single consumer and best-effort otherwise.
    pub async fn dequeue_timeout(&self, timeout: Duration) -> QueueResult<Option<Delivery<T>>> {
        if timeout.is_zero() {
            return QueueCore::try_dequeue(&self.core);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(delivery) = QueueCore::try_dequeue(&self.core)? {
                return Ok(Some(delivery));
            }
            let notified = self.core.signal.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                // waited the full budget; one last look before giving up
                return QueueCore::try_dequeue(&self.core);
            }
        }
    }

    /// Complete an in-flight entry, destroying it.
    ///
    /// Completing an id that is not in flight (double-complete, or the
    /// visibility timeout already reclaimed it) is a usage error.
    pub async fn complete(&self, id: &EntryId) -> QueueResult<()> {
        self.core.settle_complete(id)
    }

    /// Abandon an in-flight entry.
    ///
    /// With retry budget left the entry re-enters the ready list after the
    /// configured backoff; otherwise it moves to the dead-letter list.
    /// Abandoning an id that is not in flight is a usage error.
    pub async fn abandon(&self, id: &EntryId) -> QueueResult<()> {
        QueueCore::settle_abandon(&self.core, id)
    }

    /// Snapshot of the dead-letter payloads; nothing is removed
    pub fn dead_letter_items(&self) -> Vec<T> {
        let state = self.core.state.lock();
        state.dead_letter.iter().map(|e| e.payload.clone()).collect()
    }

    /// Destroy every entry and zero every counter.
    ///
    /// Pending retry tasks are invalidated; the worker and the maintenance
    /// timer keep running.
    pub fn delete(&self) {
        {
            let mut state = self.core.state.lock();
            state.clear();
            self.core.generation.fetch_add(1, Ordering::Relaxed);
            self.core.counters.reset();
        }
        self.core.update_gauge();
        debug!(queue_id = %self.core.queue_id, "queue deleted");
    }

    /// Cancel the worker and the pending maintenance timer.
    ///
    /// In-flight entries are not drained. Pending retry tasks are left to
    /// fire and discard themselves.
    pub fn dispose(&self) {
        self.core.disposed.store(true, Ordering::Relaxed);
        self.core.stop_worker();
        {
            let mut slot = self.core.maintenance.lock();
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            slot.next_at = None;
        }
        debug!(queue_id = %self.core.queue_id, "queue disposed");
    }

    /// Number of entries waiting for delivery
    pub fn ready_count(&self) -> usize {
        self.core.state.lock().ready.len()
    }

    /// Number of entries delivered but not yet settled
    pub fn in_flight_count(&self) -> usize {
        self.core.state.lock().in_flight.len()
    }

    /// Number of dead-lettered entries
    pub fn dead_letter_count(&self) -> usize {
        self.core.state.lock().dead_letter.len()
    }

    pub fn enqueued_count(&self) -> u64 {
        self.core.counters.enqueued.load(Ordering::Relaxed)
    }

    pub fn dequeued_count(&self) -> u64 {
        self.core.counters.dequeued.load(Ordering::Relaxed)
    }

    pub fn completed_count(&self) -> u64 {
        self.core.counters.completed.load(Ordering::Relaxed)
    }

    pub fn abandoned_count(&self) -> u64 {
        self.core.counters.abandoned.load(Ordering::Relaxed)
    }

    pub fn worker_error_count(&self) -> u64 {
        self.core.counters.worker_errors.load(Ordering::Relaxed)
    }

    pub fn worker_timeout_count(&self) -> u64 {
        self.core.counters.worker_timeouts.load(Ordering::Relaxed)
    }

    /// Point-in-time stats snapshot. Container counts are mutually
    /// consistent; counters are each individually consistent only.
    pub fn stats(&self) -> QueueStats {
        let (ready, in_flight, dead_letter) = {
            let state = self.core.state.lock();
            (
                state.ready.len(),
                state.in_flight.len(),
                state.dead_letter.len(),
            )
        };
        QueueStats {
            ready,
            in_flight,
            dead_letter,
            enqueued: self.enqueued_count(),
            dequeued: self.dequeued_count(),
            completed: self.completed_count(),
            abandoned: self.abandoned_count(),
            worker_errors: self.worker_error_count(),
            worker_timeouts: self.worker_timeout_count(),
        }
    }

    pub(crate) fn core(&self) -> &Arc<QueueCore<T>> {
        &self.core
    }
}

impl<T> Default for WorkQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A dequeued entry plus the context needed to settle it.
///
/// Dropping a delivery without settling leaves the entry in flight until
/// the visibility timeout reclaims it.
pub struct Delivery<T> {
    entry: Entry<T>,
    core: Arc<QueueCore<T>>,
}

impl<T> Delivery<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn id(&self) -> &EntryId {
        &self.entry.id
    }

    pub fn payload(&self) -> &T {
        &self.entry.payload
    }

    /// Delivery count including this one, so always at least 1
    pub fn attempts(&self) -> u32 {
        self.entry.attempts
    }

    pub fn dequeued_at(&self) -> Option<DateTime<Utc>> {
        self.entry.dequeued_at
    }

    pub fn entry(&self) -> &Entry<T> {
        &self.entry
    }

    /// Complete this delivery
    pub async fn complete(self) -> QueueResult<()> {
        self.core.settle_complete(&self.entry.id)
    }

    /// Abandon this delivery back to the retry path
    pub async fn abandon(self) -> QueueResult<()> {
        QueueCore::settle_abandon(&self.core, &self.entry.id)
    }
}

/// Shared queue internals behind the `WorkQueue` facade
pub(crate) struct QueueCore<T> {
    pub(crate) queue_id: String,
    pub(crate) config: QueueConfig,
    pub(crate) state: Mutex<QueueState<T>>,
    pub(crate) counters: Counters,
    pub(crate) signal: Notify,
    pub(crate) events: broadcast::Sender<QueueEvent>,
    pub(crate) hooks: RwLock<Arc<dyn QueueHooks<T>>>,
    pub(crate) metrics: RwLock<Option<Arc<dyn MetricsSink>>>,
    pub(crate) codec: RwLock<Option<Arc<dyn PayloadCodec<T>>>>,
    pub(crate) maintenance: Mutex<MaintenanceSlot>,
    pub(crate) worker: Mutex<crate::worker::WorkerSlot<T>>,
    /// Bumped by `delete` so pending retry tasks drop stale entries
    pub(crate) generation: AtomicU64,
    pub(crate) disposed: AtomicBool,
}

impl<T> QueueCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(config: QueueConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            queue_id: Uuid::new_v4().to_string(),
            config,
            state: Mutex::new(QueueState::new()),
            counters: Counters::new(),
            signal: Notify::new(),
            events,
            hooks: RwLock::new(Arc::new(NoopHooks)),
            metrics: RwLock::new(None),
            codec: RwLock::new(None),
            maintenance: Mutex::new(MaintenanceSlot::new()),
            worker: Mutex::new(crate::worker::WorkerSlot::new()),
            generation: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn hooks(&self) -> Arc<dyn QueueHooks<T>> {
        self.hooks.read().clone()
    }

    /// Detached copy of a payload: codec round trip when configured,
    /// otherwise plain clone (value semantics).
    fn deep_copy(&self, payload: &T) -> QueueResult<T> {
        let codec = self.codec.read().clone();
        match codec {
            Some(codec) => codec.deep_copy(payload),
            None => Ok(payload.clone()),
        }
    }

    /// Single non-blocking delivery attempt.
    ///
    /// On success the canonical entry moves to the in-flight table and the
    /// caller receives a detached copy; the move is atomic under the state
    /// lock.
    pub(crate) fn try_dequeue(core: &Arc<Self>) -> QueueResult<Option<Delivery<T>>> {
        let now = Utc::now();
        let (id, attempts, payload_copy) = {
            let mut state = core.state.lock();
            let Some(mut entry) = state.ready.pop_front() else {
                return Ok(None);
            };
            let payload_copy = match core.deep_copy(&entry.payload) {
                Ok(copy) => copy,
                Err(err) => {
                    state.ready.push_front(entry);
                    return Err(err);
                }
            };
            entry.record_dequeue(now);
            let id = entry.id.clone();
            let attempts = entry.attempts;
            if state.in_flight.insert(id.clone(), entry).is_some() {
                return Err(QueueError::Internal(format!(
                    "in-flight id collision: {id}"
                )));
            }
            (id, attempts, payload_copy)
        };

        core.hooks().on_dequeue(&id, &payload_copy);
        core.counters.dequeued.fetch_add(1, Ordering::Relaxed);
        if let Some(deadline) = visibility_deadline(now, core.config.visibility_timeout) {
            Self::arm_maintenance(core, deadline);
        }
        core.update_gauge();
        core.emit(QueueEvent::Dequeued {
            entry_id: id.clone(),
            attempt: attempts,
            at: now,
        });

        Ok(Some(Delivery {
            entry: Entry {
                id,
                payload: payload_copy,
                attempts,
                dequeued_at: Some(now),
            },
            core: Arc::clone(core),
        }))
    }

    pub(crate) fn settle_complete(&self, id: &EntryId) -> QueueResult<()> {
        self.hooks().on_complete(id);
        let removed = self.state.lock().in_flight.remove(id);
        if removed.is_none() {
            return Err(QueueError::NotInFlight(id.to_string()));
        }
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        self.update_gauge();
        self.emit(QueueEvent::Completed {
            entry_id: id.clone(),
            at: Utc::now(),
        });
        Ok(())
    }

    /// Remove an entry from in-flight and route it to retry or dead-letter.
    /// Shared by explicit abandons and visibility-timeout reclaims.
    pub(crate) fn settle_abandon(core: &Arc<Self>, id: &EntryId) -> QueueResult<()> {
        core.hooks().on_abandon(id);
        let now = Utc::now();

        let mut state = core.state.lock();
        let Some(entry) = state.in_flight.remove(id) else {
            return Err(QueueError::NotInFlight(id.to_string()));
        };
        core.counters.abandoned.fetch_add(1, Ordering::Relaxed);

        if entry.attempts < core.config.max_attempts() {
            let attempt = entry.attempts;
            let delay = core.config.retry_policy.next_delay(attempt);
            if delay.is_zero() {
                state.ready.push_back(entry);
                drop(state);
                core.signal.notify_one();
            } else {
                drop(state);
                core.schedule_retry(entry, delay);
            }
            let retry_at = now
                .checked_add_signed(chrono_delay(delay))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            core.emit(QueueEvent::RetryScheduled {
                entry_id: id.clone(),
                attempt,
                retry_at,
                at: now,
            });
        } else {
            let attempts = entry.attempts;
            state.dead_letter.push(entry);
            drop(state);
            debug!(entry_id = %id, attempts, "retry budget exhausted, dead-lettering");
            core.emit(QueueEvent::DeadLettered {
                entry_id: id.clone(),
                attempts,
                at: now,
            });
        }

        core.update_gauge();
        Ok(())
    }

    /// Re-insert an abandoned entry after its backoff delay. The task is
    /// tied to the queue, not the worker, so it survives `stop_working`.
    fn schedule_retry(self: &Arc<Self>, entry: Entry<T>, delay: Duration) {
        let generation = self.generation.load(Ordering::Relaxed);
        let core = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            core.requeue_if_current(entry, generation);
        });
    }

    fn requeue_if_current(&self, entry: Entry<T>, generation: u64) {
        {
            let mut state = self.state.lock();
            if self.disposed.load(Ordering::Relaxed)
                || self.generation.load(Ordering::Relaxed) != generation
            {
                debug!(entry_id = %entry.id, "dropping retry for a deleted or disposed queue");
                return;
            }
            state.ready.push_back(entry);
        }
        self.signal.notify_one();
        self.update_gauge();
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        // lossy by design: nobody listening is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn update_gauge(&self) {
        let Some(name) = self.config.gauge_name.as_deref() else {
            return;
        };
        let sink = self.metrics.read().clone();
        if let Some(sink) = sink {
            let depth = self.state.lock().ready.len() as u64;
            sink.gauge(name, depth);
        }
    }
}

fn chrono_delay(delay: Duration) -> ChronoDuration {
    ChronoDuration::from_std(delay).unwrap_or(ChronoDuration::MAX)
}

fn visibility_deadline(from: DateTime<Utc>, timeout: Duration) -> Option<DateTime<Utc>> {
    ChronoDuration::from_std(timeout)
        .ok()
        .and_then(|v| from.checked_add_signed(v))
}
