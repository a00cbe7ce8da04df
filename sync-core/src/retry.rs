//! Retry timing policy.
//!
//! Exponential backoff with multiplicative jitter. Randomness comes in
//! through [`UniformSampler`] so tests can pin the jitter factor; with a
//! zero jitter ratio the schedule is fully deterministic.

use std::sync::Arc;

use ble_sync_types::{RetryReason, TimestampMs};

/// The outcome of asking the retry policy about a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry at the given time.
    Schedule {
        /// When the retry is due.
        at: TimestampMs,
    },
    /// The attempt budget is exhausted; stop retrying.
    GiveUp,
}

/// Decides whether and when a failed operation is retried.
pub trait RetryPolicy: Send + Sync {
    /// Decide for an operation that has already been attempted
    /// `attempts_for_op` times.
    fn decide(
        &self,
        now: TimestampMs,
        attempts_for_op: u32,
        reason: &RetryReason,
    ) -> RetryDecision;
}

/// A source of uniformly distributed floats in `[lo, hi]`.
pub trait UniformSampler: Send + Sync {
    /// Draw one sample.
    fn sample(&self, lo: f64, hi: f64) -> f64;
}

/// Samples from the operating system's entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSampler;

impl UniformSampler for OsSampler {
    fn sample(&self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        let mut bytes = [0u8; 8];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        // 53 uniformly distributed mantissa bits in [0, 1).
        let unit = (u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64;
        lo + unit * (hi - lo)
    }
}

/// Always returns the same factor, clamped into the requested interval.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub f64);

impl UniformSampler for FixedSampler {
    fn sample(&self, lo: f64, hi: f64) -> f64 {
        self.0.clamp(lo, hi)
    }
}

/// Exponential backoff with multiplicative jitter.
///
/// The delay for the n-th retry (1-based) is
/// `clamp(min * 2^(n-1) * factor, min, max)` where `factor` is drawn
/// uniformly from `[1 - jitter, 1 + jitter]` (lower bound floored at 0).
pub struct ExponentialBackoff {
    max_attempts: u32,
    min_backoff_ms: u64,
    max_backoff_ms: u64,
    jitter_ratio: f64,
    sampler: Arc<dyn UniformSampler>,
}

impl ExponentialBackoff {
    /// Create a backoff policy. `jitter_ratio` is clamped to `[0, 1]`
    /// and `max_backoff_ms` is raised to at least `min_backoff_ms`.
    pub fn new(
        max_attempts: u32,
        min_backoff_ms: u64,
        max_backoff_ms: u64,
        jitter_ratio: f64,
        sampler: Arc<dyn UniformSampler>,
    ) -> Self {
        Self {
            max_attempts,
            min_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(min_backoff_ms),
            jitter_ratio: jitter_ratio.clamp(0.0, 1.0),
            sampler,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn decide(
        &self,
        now: TimestampMs,
        attempts_for_op: u32,
        _reason: &RetryReason,
    ) -> RetryDecision {
        if attempts_for_op >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let next_index = attempts_for_op + 1;
        let doubling = 2u64.saturating_pow(next_index - 1);
        let raw = self
            .min_backoff_ms
            .saturating_mul(doubling)
            .clamp(self.min_backoff_ms, self.max_backoff_ms);

        let lo = (1.0 - self.jitter_ratio).max(0.0);
        let hi = 1.0 + self.jitter_ratio;
        let factor = self.sampler.sample(lo, hi);

        let delay = ((raw as f64 * factor) as u64).clamp(self.min_backoff_ms, self.max_backoff_ms);

        RetryDecision::Schedule {
            at: now.plus_ms(delay),
        }
    }
}
