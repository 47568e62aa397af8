use std::time::Duration;

/// Backoff policy for abandoned entries.
///
/// The delay before the n-th redelivery is `base_delay * multipliers[n]`
/// (1-indexed); attempts past the end of the schedule reuse the last
/// multiplier. A zero base delay means immediate re-enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base delay applied before every retry
    pub base_delay: Duration,

    /// Multiplier schedule, 1-indexed by attempt number
    pub multipliers: Vec<u32>,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, multipliers: Vec<u32>) -> Self {
        debug_assert!(!multipliers.is_empty(), "multiplier schedule must not be empty");
        debug_assert!(multipliers.iter().all(|&m| m > 0), "multipliers must be positive");
        Self {
            base_delay,
            multipliers,
        }
    }

    /// Delay before the next delivery of an entry that has been attempted
    /// `attempts` times already.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        if self.base_delay.is_zero() || self.multipliers.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempts.max(1) as usize - 1).min(self.multipliers.len() - 1);
        self.base_delay * self.multipliers[index]
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(60),
            multipliers: vec![1, 3, 5, 10],
        }
    }
}
