use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use crate::codec::PayloadCodec;
use crate::error::QueueResult;

/// JSON codec for payload deep copies
#[derive(Debug)]
pub struct JsonCodec<T> {
    _payload: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PayloadCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, payload: &T) -> QueueResult<Vec<u8>> {
        Ok(serde_json::to_vec(payload)?)
    }

    fn decode(&self, bytes: &[u8]) -> QueueResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
