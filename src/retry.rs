//! Retry policy for failed sync jobs
//!
//! A pure decision function: given the attempt count after a failure, either
//! schedule a retry after an exponential backoff delay or dead-letter the job.
//! The queue backends consult this on their `fail` path; nothing here touches
//! the queue itself.

use std::time::Duration;

/// Outcome of a failure for a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue after the given delay
    Retry { delay: Duration },
    /// Retry budget exhausted, move to the dead-letter lane
    DeadLetter,
}

/// Exponential backoff retry policy
///
/// Delay for attempt `n` is `backoff_base_seconds ^ n` seconds, so with the
/// default base of 2 a job waits 2s, 4s, 8s between successive retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_seconds: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_seconds: u64) -> Self {
        Self {
            max_retries,
            backoff_base_seconds,
        }
    }

    /// Decide what happens to a job after a failed attempt
    ///
    /// `attempts` is the job's attempt count including the failure being
    /// handled, i.e. after the increment.
    pub fn decide(&self, attempts: u32) -> RetryDecision {
        if attempts < self.max_retries {
            RetryDecision::Retry {
                delay: self.backoff_delay(attempts),
            }
        } else {
            RetryDecision::DeadLetter
        }
    }

    /// Backoff delay before a job with `attempts` failures becomes visible again
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        // saturating_pow keeps a misconfigured base/attempt pair from panicking
        let seconds = self.backoff_base_seconds.saturating_pow(attempts);
        Duration::from_secs(seconds)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 2)
    }
}
