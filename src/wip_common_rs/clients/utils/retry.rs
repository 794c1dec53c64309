//! Retry/backoff policy owned by the per-role clients, standing in for the
//! orchestrator's retry responsibility (§4.G: "the transport does not
//! itself retry; retry policy is owned by the orchestrator ... bounded by
//! a configurable count with exponential backoff").
//!
//! Grounded on the teacher's `query_client.rs`/`report_client.rs` retry
//! loops, generalized from a fixed per-attempt delay to the spec's
//! doubling-capped-at-10s schedule and shared across all four role
//! clients instead of being duplicated per client.

use std::thread;
use std::time::Duration;

use crate::wip_common_rs::packet::core::error::WipError;

/// Exponential backoff: default 1s initial delay, doubling each retry,
/// capped at 10s (§4.G).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32.checked_shl(doublings).unwrap_or(u32::MAX))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `attempt` up to `max_attempts` times, retrying only on
    /// `timeout` and classified-retryable `io_error` (§7 propagation
    /// policy) with a sleep between attempts per the doubling schedule.
    /// Every other error, and exhaustion of the retry budget, is returned
    /// immediately.
    pub fn run<T>(&self, mut attempt_fn: impl FnMut(u32) -> Result<T, WipError>) -> Result<T, WipError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match attempt_fn(attempt) {
                Ok(value) => return Ok(value),
                Err(WipError::Timeout) if attempt < self.max_attempts => {
                    thread::sleep(self.delay_for_attempt(attempt));
                }
                Err(WipError::Io(e)) if attempt < self.max_attempts && crate::wip_common_rs::packet::core::error::is_retryable_io(&e) => {
                    thread::sleep(self.delay_for_attempt(attempt));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
