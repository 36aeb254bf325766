//! Retry ceiling and backoff delay computation.

use std::time::Duration;

/// HTTP statuses treated as transient.
pub const RETRIABLE_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];

/// Consecutive transient failures tolerated before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Retry configuration for a [`ResumableUploadDriver`](crate::ResumableUploadDriver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts beyond this count fail the session.
    pub max_retries: u32,
    /// Resets the attempt counter whenever a chunk is accepted.
    ///
    /// With `false` the counter only ever grows, so the ceiling bounds the
    /// total number of retries over the whole upload instead of the number
    /// of consecutive ones.
    pub reset_on_progress: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            reset_on_progress: true,
        }
    }
}

impl RetryPolicy {
    /// Upper bound (exclusive) of the sleep before retry `attempt` (1-based):
    /// `2^attempt` seconds. Only clamped where `Duration` would overflow.
    pub fn max_delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(2f64.powi(attempt.min(63) as i32))
    }

    /// Delay for `attempt`, drawn uniformly from `[0, 2^attempt)` seconds.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_with_sample(attempt, rand::random::<f64>())
    }

    /// Delay for `attempt` given a uniform sample in `[0, 1)`.
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let sample = sample.clamp(0.0, 1.0 - f64::EPSILON);
        let secs = sample * self.max_delay_for_attempt(attempt).as_secs_f64();
        // Truncate to whole nanoseconds so the bound stays exclusive.
        Duration::from_nanos((secs * 1e9) as u64)
    }

    /// Whether `attempt` is past the ceiling.
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_retries
    }
}
