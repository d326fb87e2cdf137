//! Fault classes and backoff policy for legacy procedure calls.
//!
//! Timeouts back off linearly, write conflicts exponentially, and every
//! delay (including the one before the first attempt) carries a random
//! jitter so callers that start together drift apart.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;

/// How a failed legacy call is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultClass {
    /// No response within the call ceiling.
    Timeout,
    /// Deadlock, lock conflict or update conflict.
    Conflict,
    /// Anything else: surfaced immediately.
    Fatal,
}

impl FaultClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for FaultClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunable retry parameters for legacy procedure calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Ceiling for a single call before it counts as a timeout.
    pub call_timeout: Duration,
    /// Extra attempts after a timeout.
    pub max_timeout_retries: u32,
    /// Linear step for timeout backoff (`step * attempt`).
    pub timeout_backoff_step: Duration,
    /// Extra attempts after a write conflict.
    pub max_conflict_retries: u32,
    /// Base for conflict backoff (`base * 2^(retry - 1)`).
    pub conflict_backoff_base: Duration,
    /// Lower jitter bound.
    pub jitter_min: Duration,
    /// Upper jitter bound (inclusive).
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            max_timeout_retries: 1,
            timeout_backoff_step: Duration::from_millis(2000),
            max_conflict_retries: 3,
            conflict_backoff_base: Duration::from_millis(1000),
            jitter_min: Duration::from_millis(100),
            jitter_max: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy with no delays at all, for tests.
    pub fn immediate() -> Self {
        Self {
            timeout_backoff_step: Duration::ZERO,
            conflict_backoff_base: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Maximum number of retries allowed for `class`.
    pub fn max_retries(&self, class: FaultClass) -> u32 {
        match class {
            FaultClass::Timeout => self.max_timeout_retries,
            FaultClass::Conflict => self.max_conflict_retries,
            FaultClass::Fatal => 0,
        }
    }

    /// Deterministic part of the delay before retry number `retry`
    /// (1-based) of a fault of `class`.
    pub fn base_delay(&self, class: FaultClass, retry: u32) -> Duration {
        let retry = retry.max(1);
        match class {
            FaultClass::Timeout => self.timeout_backoff_step.saturating_mul(retry),
            FaultClass::Conflict => {
                let factor = 2u32.saturating_pow(retry - 1);
                self.conflict_backoff_base.saturating_mul(factor)
            }
            FaultClass::Fatal => Duration::ZERO,
        }
    }

    /// Random jitter within `[jitter_min, jitter_max]`.
    pub fn jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Full delay before retry number `retry`: base plus jitter.
    pub fn backoff(&self, class: FaultClass, retry: u32) -> Duration {
        self.base_delay(class, retry) + self.jitter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
