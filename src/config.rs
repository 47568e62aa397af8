use std::time::Duration;

use crate::queue::retry::RetryPolicy;

/// Configuration for a work queue.
///
/// All knobs are optional at construction; the defaults match a queue that
/// retries twice with minute-scale backoff and reclaims silent consumers
/// after ten minutes.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of abandons before an entry is dead-lettered.
    /// Zero disables retries entirely.
    pub retry_limit: u32,

    /// Backoff schedule applied between retries
    pub retry_policy: RetryPolicy,

    /// Wall-clock budget from dequeue within which the consumer must
    /// complete or abandon the entry
    pub visibility_timeout: Duration,

    /// Gauge name reported to the metrics sink; no name means no gauge
    /// calls even when a sink is configured
    pub gauge_name: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry_limit: 2,
            retry_policy: RetryPolicy::default(),
            visibility_timeout: Duration::from_secs(600),
            gauge_name: None,
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry limit
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Set the base retry delay, keeping the multiplier schedule
    pub fn with_retry_delay(mut self, base_delay: Duration) -> Self {
        self.retry_policy.base_delay = base_delay;
        self
    }

    /// Set the retry multiplier schedule (1-indexed by attempt)
    pub fn with_retry_multipliers(mut self, multipliers: Vec<u32>) -> Self {
        self.retry_policy.multipliers = multipliers;
        self
    }

    /// Set the visibility timeout
    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    /// Set the gauge name reported to the metrics sink
    pub fn with_gauge_name(mut self, name: impl Into<String>) -> Self {
        self.gauge_name = Some(name.into());
        self
    }

    /// An entry with this many deliveries has exhausted its budget once
    /// abandoned again.
    pub(crate) fn max_attempts(&self) -> u32 {
        self.retry_limit + 1
    }
}
