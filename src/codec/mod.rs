pub mod json;

pub use json::JsonCodec;

use crate::error::QueueResult;

/// Byte codec for payload deep copies.
///
/// The queue guarantees that a consumer never observes a producer's later
/// mutations and vice versa. For payloads whose `Clone` already detaches
/// all shared state, no codec is needed; for payloads carrying shared
/// references, configure a codec and the queue round-trips the payload
/// through bytes on enqueue and dequeue instead of cloning it.
pub trait PayloadCodec<T>: Send + Sync {
    /// Encode a payload to bytes
    fn encode(&self, payload: &T) -> QueueResult<Vec<u8>>;

    /// Decode a payload from bytes
    fn decode(&self, bytes: &[u8]) -> QueueResult<T>;

    /// Produce a detached copy by round-tripping through bytes
    fn deep_copy(&self, payload: &T) -> QueueResult<T> {
        let bytes = self.encode(payload)?;
        self.decode(&bytes)
    }
}
