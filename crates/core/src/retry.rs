//! Bounded retry with deterministic exponential backoff.
//!
//! Remote storage calls have elevated and variable error rates, so every
//! folder lookup and upload goes through [`execute`].

use std::future::Future;
use std::time::Duration;

/// Retry policy for a fallible async operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of invocations, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Factor the wait grows by after each further failure.
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(Self::DEFAULT_INITIAL_DELAY_MS),
            backoff_multiplier: Self::DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Default attempt count.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default initial delay: 1 second.
    pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
    /// Default backoff multiplier.
    pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        }
    }

    /// Wait after failed attempt `attempt` (1-based):
    /// `initial_delay * backoff_multiplier^(attempt - 1)`, saturating.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is exhausted.
///
/// `on_retry(&error, attempt)` fires before every wait. It is for
/// observability only and cannot change the outcome. When every attempt
/// fails, the last error is returned as-is so callers can match on it.
/// A policy with `max_attempts == 0` still runs the operation once.
pub async fn execute<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: impl FnMut(&E, u32),
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(err) => {
                on_retry(&err, attempt);
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), 2)
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Failure(u32);

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
        assert_eq!(policy.backoff_multiplier, 2);
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1), 10);
        assert_eq!(policy.delay_after(60), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let mut retries = 0;

        let result: Result<u32, Failure> = execute(
            &fast_policy(3),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            },
            |_, _| retries += 1,
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(retries, 0);
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        for k in 0..4u32 {
            let calls = AtomicU32::new(0);
            let mut seen = Vec::new();

            let result: Result<&str, Failure> = execute(
                &fast_policy(5),
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { if n <= k { Err(Failure(n)) } else { Ok("done") } }
                },
                |err, attempt| seen.push((err.0, attempt)),
            )
            .await;

            assert_eq!(result, Ok("done"));
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
            assert_eq!(seen.len(), k as usize);
            for (i, (err, attempt)) in seen.iter().enumerate() {
                let expected = u32::try_from(i).expect("small") + 1;
                assert_eq!(*err, expected);
                assert_eq!(*attempt, expected);
            }
        }
    }

    #[tokio::test]
    async fn test_always_failing_returns_last_error() {
        let calls = AtomicU32::new(0);
        let mut retries = 0;

        let result: Result<(), Failure> = execute(
            &fast_policy(3),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(Failure(n)) }
            },
            |_, _| retries += 1,
        )
        .await;

        assert_eq!(result, Err(Failure(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = AtomicU32::new(0);

        let result: Result<(), Failure> = execute(
            &fast_policy(0),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Failure(1)) }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(result, Err(Failure(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_delay_is_monotonic(
            initial_ms in 0u64..10_000,
            multiplier in 1u32..5,
            attempt in 1u32..20,
        ) {
            let policy = RetryPolicy::new(30, Duration::from_millis(initial_ms), multiplier);
            prop_assert!(policy.delay_after(attempt + 1) >= policy.delay_after(attempt));
        }

        #[test]
        fn prop_first_delay_is_initial(initial_ms in 0u64..100_000, multiplier in 0u32..10) {
            let policy = RetryPolicy::new(3, Duration::from_millis(initial_ms), multiplier);
            prop_assert_eq!(policy.delay_after(1), Duration::from_millis(initial_ms));
        }
    }
}
