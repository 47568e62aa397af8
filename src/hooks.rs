use crate::types::EntryId;

/// Lifecycle hooks injected into a queue.
///
/// All methods have no-op defaults, so implementors override only the
/// callbacks they care about. Hooks run synchronously on the calling
/// operation's thread and must be cheap; a hook that needs the queue
/// captures a clone of the facade.
pub trait QueueHooks<T>: Send + Sync {
    /// Veto hook: returning false rejects the enqueue with no state change.
    fn before_enqueue(&self, _payload: &T) -> bool {
        true
    }

    /// Runs after an entry was accepted onto the ready list
    fn after_enqueue(&self, _id: &EntryId, _payload: &T) {}

    /// Runs when an entry is delivered to a consumer
    fn on_dequeue(&self, _id: &EntryId, _payload: &T) {}

    /// Runs when an entry is completed
    fn on_complete(&self, _id: &EntryId) {}

    /// Runs when an entry is abandoned, including timeout reclaims
    fn on_abandon(&self, _id: &EntryId) {}
}

/// Default hooks: accept everything, observe nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl<T> QueueHooks<T> for NoopHooks {}
