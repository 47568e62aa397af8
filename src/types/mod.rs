pub mod entry;
pub mod events;
pub mod ids;

pub use entry::Entry;
pub use events::QueueEvent;
pub use ids::EntryId;
