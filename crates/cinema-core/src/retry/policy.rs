use std::time::Duration;

use crate::config::RetryConfig;
use crate::provider::FailureKind;

/// Where in the job lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The submit call itself failed; no operation was started.
    Submit,
    /// An operation was started and finished with an error.
    Operation,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this failure.
    NoRetry,
    /// Resubmit after the given delay.
    RetryAfter(Duration),
}

/// Linear backoff policy with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of submit attempts (including the first).
    pub max_attempts: u32,
    /// Step for operation failures: attempt N waits N * backoff_base.
    pub backoff_base: Duration,
    /// Fixed wait after a failed submit call.
    pub submit_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Zero `max_attempts` or `backoff_base_secs` are raised to 1, so every
    /// retry waits longer than the one before.
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            backoff_base: Duration::from_secs(cfg.backoff_base_secs.max(1)),
            submit_retry_delay: Duration::from_secs(cfg.submit_retry_delay_secs),
        }
    }

    /// Decide whether attempt `attempt` (1-based) should be followed by another.
    ///
    /// Hard failures never retry. Transient operation failures wait
    /// `attempt * backoff_base`, so waits strictly grow while a nonzero base is
    /// configured; submit-call failures wait the fixed `submit_retry_delay`.
    pub fn decide(&self, attempt: u32, stage: FailureStage, kind: FailureKind) -> RetryDecision {
        if kind == FailureKind::Hard {
            return RetryDecision::NoRetry;
        }
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match stage {
            FailureStage::Submit => RetryDecision::RetryAfter(self.submit_retry_delay),
            FailureStage::Operation => {
                RetryDecision::RetryAfter(self.backoff_base.saturating_mul(attempt.max(1)))
            }
        }
    }
}
