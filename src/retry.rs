//! Bounded retry with exponential backoff for stage fetches.
//!
//! Each loading stage wraps its network call in a [`RetryPolicy`]. Budgets
//! differ per stage because each stage has a different latency allowance:
//! the critical stage must feel instant, while enhancement work runs
//! invisibly and can afford longer waits.

use std::future::Future;
use std::time::Duration;

use crate::platform;

/// Bounded exponential-backoff policy.
///
/// A policy value is stateless and reusable across calls; per-call retry
/// bookkeeping (attempt count, current delay) is local to each [`run`]
/// execution and never shared between concurrent calls.
///
/// [`run`]: RetryPolicy::run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retry attempts after the initial one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap for exponential growth.
    pub max_delay: Duration,
    /// Growth factor between consecutive retries.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Budget for the critical stage: fewer attempts with a shorter initial
    /// delay, so a failing summary resolves quickly.
    pub const CRITICAL: Self = Self {
        max_retries: 2,
        initial_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(4),
        backoff_multiplier: 2.0,
    };

    /// Budget for the full stage.
    pub const FULL: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(8),
        backoff_multiplier: 2.0,
    };

    /// Budget for the enhancement stage.
    pub const ENHANCEMENT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(8),
        backoff_multiplier: 2.0,
    };

    /// Creates a policy from explicit parts.
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Delay before retry `attempt` (0-indexed):
    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay = self.initial_delay.as_secs_f64() * multiplier;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// All retry delays in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }

    /// Runs `operation`, retrying failures with backoff until the budget is
    /// exhausted. The final attempt's failure is propagated to the caller
    /// unchanged; the policy never swallows a terminal failure.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.max_retries {
                        return Err(error);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    crate::debug_log!(
                        "retrying in {:?} (retry {}/{})",
                        delay,
                        attempt + 1,
                        self.max_retries
                    );
                    platform::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_millis(1),
            Duration::from_millis(10),
            2.0,
        )
    }

    #[test]
    fn critical_budget_is_tighter_than_full() {
        assert!(RetryPolicy::CRITICAL.max_retries < RetryPolicy::FULL.max_retries);
        assert!(RetryPolicy::CRITICAL.initial_delay < RetryPolicy::FULL.initial_delay);
    }

    #[test]
    fn delays_double_until_the_cap() {
        let policy = RetryPolicy::new(
            6,
            Duration::from_millis(100),
            Duration::from_millis(500),
            2.0,
        );
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        for delay in &delays[3..] {
            assert_eq!(*delay, Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<u32, &str> = fast(3)
            .run(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            })
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<u32, String> = fast(3)
            .run(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("flaky".to_string())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_the_final_failure_unchanged() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<u32, String> = fast(2)
            .run(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("still broken".to_string()) }
            })
            .await;
        assert_eq!(result, Err("still broken".to_string()));
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_runs_keep_separate_bookkeeping() {
        let policy = fast(2);
        let a_calls = Arc::new(AtomicU32::new(0));
        let b_calls = Arc::new(AtomicU32::new(0));

        let a_counter = a_calls.clone();
        let a = policy.run(move || {
            a_counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>("a") }
        });
        let b_counter = b_calls.clone();
        let b = policy.run(move || {
            let n = b_counter.fetch_add(1, Ordering::SeqCst);
            async move { if n == 0 { Err("b") } else { Ok(1u32) } }
        });

        let (a, b) = tokio::join!(a, b);
        assert!(a.is_err());
        assert_eq!(b, Ok(1));
        assert_eq!(a_calls.load(Ordering::SeqCst), 3);
        assert_eq!(b_calls.load(Ordering::SeqCst), 2);
    }
}
