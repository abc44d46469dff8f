//! # Retry Policy
//!
//! Bounded attempt counter owned by exactly one task state. The counter survives
//! between visits of the state, so every terminal outcome must go through
//! [`RetryPolicy::succeed`], [`RetryPolicy::fail`] or the exhaustion path of
//! [`RetryPolicy::should_attempt`], all of which zero it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state_machine::RetryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_retries: u32,
    retries: u32,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retries: 0,
        }
    }

    /// Guard evaluated on entry, before any side effect.
    ///
    /// Returns `false` once the retry budget is spent; the counter is reset in
    /// the same call so the next visit starts from scratch.
    pub fn should_attempt(&mut self) -> bool {
        if self.retries > self.max_retries {
            warn!(
                retries = self.retries,
                max_retries = self.max_retries,
                "retry budget exhausted"
            );
            self.reset();
            return false;
        }
        true
    }

    pub fn record_retry(&mut self) {
        self.retries = self.retries.saturating_add(1);
        debug!(retries = self.retries, max_retries = self.max_retries, "retry recorded");
    }

    pub fn reset(&mut self) {
        self.retries = 0;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn is_first_attempt(&self) -> bool {
        self.retries == 0
    }

    /// Transient failure: count it and report `retry`
    pub fn retry(&mut self) -> RetryOutcome {
        self.record_retry();
        RetryOutcome::Retry
    }

    pub fn succeed(&mut self) -> RetryOutcome {
        self.reset();
        RetryOutcome::Succeeded
    }

    /// Hard failure: not worth retrying, reset and report `failed`
    pub fn fail(&mut self) -> RetryOutcome {
        self.reset();
        RetryOutcome::Failed
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}
