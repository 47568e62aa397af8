use std::sync::atomic::{AtomicU64, Ordering};

/// Receiver for queue gauge readings.
///
/// Implementations forward to whatever metrics backend the host process
/// uses; the queue calls `gauge` on every state-changing operation when a
/// gauge name is configured.
pub trait MetricsSink: Send + Sync {
    fn gauge(&self, name: &str, value: u64);
}

/// Monotonic operation counters for one queue instance.
///
/// Individually consistent reads; no cross-counter snapshot is implied.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub enqueued: AtomicU64,
    pub dequeued: AtomicU64,
    pub completed: AtomicU64,
    pub abandoned: AtomicU64,
    pub worker_errors: AtomicU64,
    pub worker_timeouts: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter. Only `delete` does this.
    pub fn reset(&self) {
        self.enqueued.store(0, Ordering::Relaxed);
        self.dequeued.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.abandoned.store(0, Ordering::Relaxed);
        self.worker_errors.store(0, Ordering::Relaxed);
        self.worker_timeouts.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of queue state and counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub ready: usize,
    pub in_flight: usize,
    pub dead_letter: usize,
    pub enqueued: u64,
    pub dequeued: u64,
    pub completed: u64,
    pub abandoned: u64,
    pub worker_errors: u64,
    pub worker_timeouts: u64,
}
