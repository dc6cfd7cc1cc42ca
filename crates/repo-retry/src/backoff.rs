//! Exponential backoff with full jitter
//!
//! `delay = min(base * 2^attempt, max)`, then optionally replaced by a
//! uniform sample from `[0, delay]`. Rate-limited failures never wait less
//! than [`RATE_LIMIT_FLOOR_SECS`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classify::FailureKind;
use crate::config::RetryConfig;

/// Minimum wait in seconds after a rate-limited failure, jitter or not
pub const RATE_LIMIT_FLOOR_SECS: f64 = 30.0;

/// Exponent cap; `2^1023` is the largest finite power of two in an f64
const MAX_EXPONENT: u32 = 1023;

/// Source of uniform samples for jitter.
///
/// Implementations must be safe to share between concurrently running
/// retry loops.
pub trait JitterSource: Send + Sync + fmt::Debug {
    /// Return a value in `[0, upper]`
    fn sample(&self, upper: f64) -> f64;
}

/// Jitter from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadJitter;

impl JitterSource for ThreadJitter {
    fn sample(&self, upper: f64) -> f64 {
        if upper <= 0.0 || !upper.is_finite() {
            return upper.max(0.0);
        }
        rand::thread_rng().gen_range(0.0..=upper)
    }
}

/// Reproducible jitter from a seeded RNG
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&self, upper: f64) -> f64 {
        if upper <= 0.0 || !upper.is_finite() {
            return upper.max(0.0);
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0.0..=upper)
    }
}

/// Jitter that always returns the same fraction of the upper bound.
///
/// `FixedJitter::new(0.0)` always samples the low end, `1.0` the high end.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter {
    fraction: f64,
}

impl FixedJitter {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

impl JitterSource for FixedJitter {
    fn sample(&self, upper: f64) -> f64 {
        upper.max(0.0) * self.fraction
    }
}

/// Computes the wait between attempts
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    source: Arc<dyn JitterSource>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::with_source(ThreadJitter)
    }
}

impl BackoffPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific random source for jitter
    pub fn with_source(source: impl JitterSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Share an existing random source
    pub fn with_shared_source(source: Arc<dyn JitterSource>) -> Self {
        Self { source }
    }

    /// Delay in seconds before the attempt after `attempt` (0-indexed).
    pub fn compute_delay(
        &self,
        attempt: u32,
        base_delay: f64,
        max_delay: f64,
        jitter: bool,
        kind: FailureKind,
    ) -> f64 {
        let mut delay = exponential_delay(attempt, base_delay, max_delay);

        if jitter {
            delay = self.source.sample(delay).min(delay).max(0.0);
        }

        if kind == FailureKind::RateLimited {
            delay = delay.max(RATE_LIMIT_FLOOR_SECS);
        }

        delay
    }

    /// [`compute_delay`](Self::compute_delay) driven by a retry configuration
    pub fn delay_for(&self, attempt: u32, config: &RetryConfig, kind: FailureKind) -> Duration {
        let secs = self.compute_delay(
            attempt,
            config.base_delay().as_secs_f64(),
            config.max_delay().as_secs_f64(),
            config.jitter(),
            kind,
        );
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// `min(base * 2^attempt, max)` without jitter
pub fn exponential_delay(attempt: u32, base_delay: f64, max_delay: f64) -> f64 {
    let exponent = attempt.min(MAX_EXPONENT) as i32;
    (base_delay * 2f64.powi(exponent)).min(max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1.0)]
    #[case(1, 2.0)]
    #[case(2, 4.0)]
    #[case(5, 32.0)]
    #[case(6, 60.0)]
    #[case(40, 60.0)]
    fn test_exponential_delay_caps_at_max(#[case] attempt: u32, #[case] expected: f64) {
        assert_eq!(exponential_delay(attempt, 1.0, 60.0), expected);
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        assert_eq!(exponential_delay(u32::MAX, 2.0, 120.0), 120.0);
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let policy = BackoffPolicy::with_source(FixedJitter::new(0.5));
        let delay = policy.compute_delay(3, 2.0, 120.0, false, FailureKind::Transient);
        assert_eq!(delay, 16.0);
    }

    #[test]
    fn test_full_jitter_scales_whole_delay() {
        let policy = BackoffPolicy::with_source(FixedJitter::new(0.25));
        let delay = policy.compute_delay(2, 1.0, 60.0, true, FailureKind::Transient);
        assert_eq!(delay, 1.0);
    }

    #[test]
    fn test_rate_limit_floor_applies_after_jitter() {
        let policy = BackoffPolicy::with_source(FixedJitter::new(0.0));
        let delay = policy.compute_delay(0, 1.0, 60.0, true, FailureKind::RateLimited);
        assert_eq!(delay, RATE_LIMIT_FLOOR_SECS);
    }

    #[test]
    fn test_rate_limit_floor_exceeds_small_max_delay() {
        let policy = BackoffPolicy::with_source(FixedJitter::new(1.0));
        let delay = policy.compute_delay(4, 0.5, 5.0, false, FailureKind::RateLimited);
        assert_eq!(delay, RATE_LIMIT_FLOOR_SECS);
    }

    #[test]
    fn test_rate_limit_keeps_longer_computed_delay() {
        let policy = BackoffPolicy::with_source(FixedJitter::new(1.0));
        let delay = policy.compute_delay(6, 1.0, 120.0, false, FailureKind::RateLimited);
        assert_eq!(delay, 64.0);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let a = BackoffPolicy::with_source(SeededJitter::new(42));
        let b = BackoffPolicy::with_source(SeededJitter::new(42));
        let first: Vec<f64> = (0..5)
            .map(|i| a.compute_delay(i, 1.0, 60.0, true, FailureKind::Transient))
            .collect();
        let second: Vec<f64> = (0..5)
            .map(|i| b.compute_delay(i, 1.0, 60.0, true, FailureKind::Transient))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_delay_for_uses_config() {
        let config = RetryConfig::new(3, Duration::from_secs(2), Duration::from_secs(10))
            .unwrap()
            .with_jitter(false);
        let policy = BackoffPolicy::new();
        assert_eq!(
            policy.delay_for(1, &config, FailureKind::Transient),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.delay_for(9, &config, FailureKind::Transient),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_thread_jitter_handles_zero_upper() {
        assert_eq!(ThreadJitter.sample(0.0), 0.0);
    }
}
