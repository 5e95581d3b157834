//! Retry policy for transient endpoint timeouts.
//!
//! Re-expressed as a value object so the backoff schedule is injectable:
//! production uses seconds, tests use milliseconds under a paused clock.
//! Only timeout-class errors are retried; everything else propagates on
//! the first attempt.

use backon::ExponentialBuilder;
use std::time::Duration;

/// Bounded exponential-backoff retry policy.
///
/// Defaults match the production schedule: up to 5 attempts total, waits
/// starting at 1s and doubling per attempt, capped at 60s per wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (so 5 means 4 retries).
    pub max_attempts: usize,

    /// Wait before the first retry.
    pub min_delay: Duration,

    /// Per-wait cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries. Useful for tests and fail-fast setups.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Compile the policy into a backoff builder for `backon`.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GeneratorError;
    use backon::Retryable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn flaky(
        calls: &AtomicUsize,
        fail_first: usize,
    ) -> Result<&'static str, GeneratorError> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < fail_first {
            Err(GeneratorError::Timeout(Duration::from_secs(1)))
        } else {
            Ok("ok")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_fifth_attempt() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result = (|| flaky(&calls, 4))
            .retry(policy.backoff())
            .when(GeneratorError::is_retryable)
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausting_retries_reraises_timeout() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result = (|| flaky(&calls, usize::MAX))
            .retry(policy.backoff())
            .when(GeneratorError::is_retryable)
            .await;

        assert!(matches!(result, Err(GeneratorError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_double_up_to_default_schedule() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();

        let _ = (|| flaky(&calls, 4))
            .retry(policy.backoff())
            .when(GeneratorError::is_retryable)
            .await;

        // Waits of 1s, 2s, 4s, 8s under the paused clock.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(15), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(16), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_are_capped() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy {
            max_attempts: 4,
            min_delay: Duration::from_secs(40),
            max_delay: Duration::from_secs(60),
        };
        let started = tokio::time::Instant::now();

        let _ = (|| flaky(&calls, usize::MAX))
            .retry(policy.backoff())
            .when(GeneratorError::is_retryable)
            .await;

        // 40s, then 60s twice (80s and 160s hit the cap).
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(160), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(161), "elapsed {elapsed:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_propagates_immediately() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result = (|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GeneratorError::Api {
                status: 401,
                message: "unauthorized".to_string(),
            })
        })
        .retry(policy.backoff())
        .when(GeneratorError::is_retryable)
        .await;

        assert!(matches!(result, Err(GeneratorError::Api { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_gives_single_attempt() {
        let calls = AtomicUsize::new(0);

        let result = (|| flaky(&calls, usize::MAX))
            .retry(RetryPolicy::none().backoff())
            .when(GeneratorError::is_retryable)
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
