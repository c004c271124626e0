//! Bounded Retry Policy
//!
//! One retry policy object shared by every component that retries:
//! thumbnail capture (3 attempts) and stream fallback (1 attempt).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many attempts a component may spend and how long to back off between
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base backoff between attempts; scaled linearly by attempt number.
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_ms,
        }
    }

    /// A single attempt with no retry.
    pub fn once() -> Self {
        Self::new(1, 0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Thumbnail default: three tries, short linear backoff.
        Self {
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

/// Instance-local attempt tracking for one policy. Reset only when the
/// underlying source identity changes.
#[derive(Clone, Copy, Debug)]
pub struct RetryBudget {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryBudget {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Attempts spent so far. Never exceeds `max_attempts`.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Claims one attempt. Returns `false` when the budget is spent, in which
    /// case the caller falls back instead of retrying.
    pub fn try_begin(&mut self) -> bool {
        if self.attempts >= self.policy.max_attempts {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Delay before the next attempt: linear in the number spent so far.
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(self.policy.backoff_ms * u64::from(self.attempts))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
