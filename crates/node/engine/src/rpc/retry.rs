//! Backoff schedules for engine calls.

use backon::BackoffBuilder;
use std::{iter::Empty, time::Duration};

/// Linear backoff: waits `step, 2 * step, ...` up to `cap` between attempts, then `cap` for every
/// further retry.
///
/// Yields one delay per retry, so a schedule bounded to `n` attempts yields `n - 1` delays. The
/// first attempt is never delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    step: Duration,
    cap: Duration,
    max_attempts: Option<u32>,
    retries: u32,
    next: Duration,
}

impl LinearBackoff {
    /// Default delay increment.
    pub const DEFAULT_STEP: Duration = Duration::from_secs(1);
    /// Default maximum delay.
    pub const DEFAULT_CAP: Duration = Duration::from_secs(30);

    /// Creates an unbounded schedule.
    pub const fn new(step: Duration, cap: Duration) -> Self {
        Self { step, cap, max_attempts: None, retries: 0, next: step }
    }

    /// Bounds the schedule to `max_attempts` attempts in total.
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STEP, Self::DEFAULT_CAP)
    }
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| self.retries.saturating_add(1) >= max) {
            return None;
        }
        self.retries = self.retries.saturating_add(1);
        let current = self.next.min(self.cap);
        self.next = current.saturating_add(self.step).min(self.cap);
        Some(current)
    }
}

/// Attempts once and never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetry;

impl BackoffBuilder for NoRetry {
    type Backoff = Empty<Duration>;

    fn build(self) -> Self::Backoff {
        std::iter::empty()
    }
}

/// Builds a fresh backoff schedule for every call made by an [`EngineClient`].
///
/// [`EngineClient`]: crate::EngineClient
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Unbounded linear backoff capped at 30 seconds.
    #[default]
    Linear,
    /// Linear backoff with a bounded number of attempts.
    LinearBounded {
        /// Total number of attempts.
        max_attempts: u32,
    },
    /// A single attempt.
    Never,
}

impl BackoffBuilder for RetryStrategy {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        match self {
            Self::Linear => LinearBackoff::default(),
            Self::LinearBounded { max_attempts } => {
                LinearBackoff::default().with_max_attempts(max_attempts)
            }
            Self::Never => LinearBackoff::default().with_max_attempts(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_sequence() {
        let delays: Vec<u64> = LinearBackoff::default().take(33).map(|d| d.as_secs()).collect();
        let mut expected: Vec<u64> = (1..=30).collect();
        expected.extend([30, 30, 30]);
        assert_eq!(delays, expected);
    }

    #[test]
    fn test_bounded_backoff() {
        let delays: Vec<_> = LinearBackoff::default().with_max_attempts(3).collect();
        assert_eq!(delays, [Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(LinearBackoff::default().with_max_attempts(1).next(), None);
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(NoRetry.build().next(), None);
    }

    #[test]
    fn test_strategy_builds_fresh_schedules() {
        let strategy = RetryStrategy::LinearBounded { max_attempts: 2 };
        assert_eq!(strategy.build().count(), 1);
        assert_eq!(strategy.build().count(), 1);
        assert_eq!(RetryStrategy::Never.build().next(), None);
        assert_eq!(RetryStrategy::Linear.build().next(), Some(Duration::from_secs(1)));
    }
}
