use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{HandlerError, QueueError};
use crate::queue::{QueueCore, WorkQueue};
use crate::types::Entry;

/// How long an idle worker waits on the availability signal per iteration
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// User handler driven by the embedded worker loop.
///
/// Returning `Ok` with auto-complete enabled settles the entry; returning
/// `Err` abandons it into the retry path. With auto-complete disabled the
/// handler settles the entry itself, typically through a captured queue
/// handle.
#[async_trait]
pub trait EntryHandler<T>: Send + Sync {
    async fn handle(&self, entry: &Entry<T>) -> Result<(), HandlerError>;
}

/// The queue's single worker: installed handler plus the running loop
pub(crate) struct WorkerSlot<T> {
    pub handler: Option<Arc<dyn EntryHandler<T>>>,
    pub auto_complete: bool,
    pub shutdown: Option<watch::Sender<bool>>,
    pub join: Option<JoinHandle<()>>,
}

impl<T> WorkerSlot<T> {
    pub fn new() -> Self {
        Self {
            handler: None,
            auto_complete: false,
            shutdown: None,
            join: None,
        }
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Install a handler and start the embedded worker if none is running.
    ///
    /// At most one worker runs per queue instance; calling this again just
    /// swaps the handler under the running loop.
    pub async fn start_working(&self, handler: Arc<dyn EntryHandler<T>>, auto_complete: bool) {
        let core = Arc::clone(self.core());
        let mut slot = core.worker.lock();
        slot.handler = Some(handler);
        slot.auto_complete = auto_complete;

        if slot.shutdown.is_none() {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            slot.shutdown = Some(shutdown_tx);
            let loop_core = Arc::clone(&core);
            slot.join = Some(tokio::spawn(async move {
                worker_loop(loop_core, shutdown_rx).await;
            }));
            debug!(queue_id = %core.queue_id, "worker started");
        }
    }

    /// Cancel the worker and detach the handler.
    ///
    /// Cancellation is cooperative: an in-progress handler call finishes,
    /// then the loop exits. Pending retry tasks are unaffected.
    pub async fn stop_working(&self) {
        self.core().stop_worker();
    }
}

impl<T> QueueCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn stop_worker(&self) {
        let mut slot = self.worker.lock();
        if let Some(shutdown) = slot.shutdown.take() {
            let _ = shutdown.send(true);
            debug!(queue_id = %self.queue_id, "worker stop requested");
        }
        slot.handler = None;
        slot.join = None;
    }
}

async fn worker_loop<T>(core: Arc<QueueCore<T>>, mut shutdown: watch::Receiver<bool>)
where
    T: Clone + Send + Sync + 'static,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        let (handler, auto_complete) = {
            let slot = core.worker.lock();
            (slot.handler.clone(), slot.auto_complete)
        };

        let idle = handler.is_none() || core.state.lock().ready.is_empty();
        if idle {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::timeout(IDLE_WAIT, core.signal.notified()) => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }

        let Some(handler) = handler else {
            continue;
        };

        let delivery = match QueueCore::try_dequeue(&core) {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(err) => {
                warn!(queue_id = %core.queue_id, error = %err, "worker dequeue failed");
                continue;
            }
        };

        let id = delivery.id().clone();
        match handler.handle(delivery.entry()).await {
            Ok(()) => {
                if auto_complete {
                    if let Err(QueueError::NotInFlight(_)) = core.settle_complete(&id) {
                        // reclaimed by the visibility timeout mid-handler
                        debug!(entry_id = %id, "entry settled elsewhere before auto-complete");
                    }
                }
            }
            Err(err) => {
                warn!(entry_id = %id, error = %err, "handler failed, abandoning entry");
                core.counters.worker_errors.fetch_add(1, Ordering::Relaxed);
                if let Err(QueueError::NotInFlight(_)) = QueueCore::settle_abandon(&core, &id) {
                    debug!(entry_id = %id, "entry settled elsewhere before abandon");
                }
            }
        }
    }

    debug!(queue_id = %core.queue_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use std::sync::atomic::AtomicU32;

    struct CountingHandler {
        seen: AtomicU32,
    }

    #[async_trait]
    impl EntryHandler<u32> for CountingHandler {
        async fn handle(&self, _entry: &Entry<u32>) -> Result<(), HandlerError> {
            self.seen.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_start_swaps_handler_without_second_worker() {
        let q: WorkQueue<u32> = WorkQueue::with_config(
            QueueConfig::new().with_retry_limit(0),
        );
        let handler = Arc::new(CountingHandler {
            seen: AtomicU32::new(0),
        });

        q.start_working(handler.clone(), true).await;
        q.start_working(handler.clone(), true).await;

        q.enqueue(1).await.unwrap();
        q.enqueue(2).await.unwrap();

        for _ in 0..50 {
            if q.completed_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(q.completed_count(), 2);
        assert_eq!(handler.seen.load(Ordering::Relaxed), 2);

        q.stop_working().await;
    }

    #[tokio::test]
    async fn stop_working_detaches_handler() {
        let q: WorkQueue<u32> = WorkQueue::new();
        let handler = Arc::new(CountingHandler {
            seen: AtomicU32::new(0),
        });

        q.start_working(handler.clone(), true).await;
        q.stop_working().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        q.enqueue(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // the stopped worker never saw the entry
        assert_eq!(handler.seen.load(Ordering::Relaxed), 0);
        assert_eq!(q.ready_count(), 1);
    }
}
