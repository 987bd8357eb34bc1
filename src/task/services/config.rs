//! Orchestrator configuration.

use crate::task::domain::FeeRate;
use std::time::Duration;

/// Bounded exponential backoff for retryable external failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per external call, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retries the default number of times without waiting.
    ///
    /// Useful for tests that script transient failures.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Makes every call a single attempt.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Returns the delay to wait before retry number `retry` (zero-based).
    ///
    /// The delay doubles with each retry and never exceeds `max_delay`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        2_u32
            .checked_pow(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Settings shared by every orchestrator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Platform fee charged on top of each task's value.
    pub fee_rate: FeeRate,
    /// Retry policy for external calls.
    pub retry: RetryPolicy,
    /// Time limit for a single external call attempt.
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fee_rate: FeeRate::default(),
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl OrchestratorConfig {
    /// Sets the platform fee rate.
    #[must_use]
    pub const fn with_fee_rate(mut self, fee_rate: FeeRate) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}
