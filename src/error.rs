use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    /// `complete` or `abandon` was called for an id that is not in flight.
    /// This is a usage error: the entry was already settled, or it was
    /// reclaimed by the visibility timeout before the caller got to it.
    #[error("Entry not in flight: {0}")]
    NotInFlight(String),

    #[error("Payload serialization error: {0}")]
    Serialization(String),

    #[error("Worker handler failed: {0}")]
    Handler(#[from] HandlerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a worker handler - the loop abandons the entry
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
