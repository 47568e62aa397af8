use std::collections::{HashMap, VecDeque};

use crate::types::{Entry, EntryId};

/// Container state for one queue instance.
///
/// Ready, in-flight, and dead-letter all live behind a single mutex so that
/// an entry's move between containers is atomic for every observer.
pub(crate) struct QueueState<T> {
    /// Entries waiting to be delivered, oldest first
    pub ready: VecDeque<Entry<T>>,

    /// Entries delivered but not yet settled, keyed by id
    pub in_flight: HashMap<EntryId, Entry<T>>,

    /// Entries whose retry budget is exhausted, in arrival order
    pub dead_letter: Vec<Entry<T>>,
}

impl<T> QueueState<T> {
    pub fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            in_flight: HashMap::new(),
            dead_letter: Vec::new(),
        }
    }

    /// Drop every entry. Counter handling is the caller's concern.
    pub fn clear(&mut self) {
        self.ready.clear();
        self.in_flight.clear();
        self.dead_letter.clear();
    }
}

impl<T> Default for QueueState<T> {
    fn default() -> Self {
        Self::new()
    }
}
