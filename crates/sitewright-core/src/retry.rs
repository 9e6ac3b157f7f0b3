//! Retry with exponential backoff and jitter
//!
//! [`exponential_backoff`] is the pure delay calculation. [`RetryPolicy`]
//! bundles it with an attempt cap, and [`retry_async`] / [`retry_blocking`]
//! drive a fallible operation under a policy.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Fraction of the delay that jitter may add or remove
const JITTER_FRACTION: f64 = 0.25;

/// Compute an exponential backoff delay in seconds.
///
/// `min(base * factor^attempt, cap)`, perturbed by up to ±25% when `jitter`
/// is set, and always clamped to `[0, cap]`.
pub fn exponential_backoff<R: Rng + ?Sized>(
    attempt: u32,
    base: f64,
    factor: f64,
    cap: f64,
    jitter: bool,
    rng: &mut R,
) -> f64 {
    let cap = cap.max(0.0);
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let mut delay = (base * factor.powi(exponent)).min(cap);

    if jitter && delay > 0.0 {
        let spread = delay * JITTER_FRACTION;
        delay += rng.gen_range(-spread..=spread);
    }

    if delay.is_nan() {
        return 0.0;
    }
    delay.clamp(0.0, cap)
}

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied per attempt
    pub factor: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Perturb delays by up to ±25%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts`, 1s base delay, factor 2, 60s cap and jitter
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay to wait after the 0-indexed `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = exponential_backoff(
            attempt,
            self.base_delay.as_secs_f64(),
            self.factor,
            self.max_delay.as_secs_f64(),
            self.jitter,
            &mut rand::thread_rng(),
        );
        Duration::from_secs_f64(secs)
    }
}

/// Run an async operation under `policy`.
///
/// Errors for which `is_retryable` returns false are returned immediately.
/// Retryable errors are retried after [`RetryPolicy::delay_for`] until the
/// attempt cap, after which the last error is returned unchanged.
pub async fn retry_async<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    op_name: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) if attempt + 1 >= max_attempts => {
                error!(op = op_name, attempts = max_attempts, error = %err, "giving up");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Blocking counterpart of [`retry_async`]; sleeps the calling thread.
pub fn retry_blocking<T, E, F, P>(
    policy: &RetryPolicy,
    op_name: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) if attempt + 1 >= max_attempts => {
                error!(op = op_name, attempts = max_attempts, error = %err, "giving up");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts)
            .with_base_delay(Duration::from_millis(1))
            .without_jitter()
    }

    #[test]
    fn test_backoff_without_jitter_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(exponential_backoff(0, 1.0, 2.0, 60.0, false, &mut rng), 1.0);
        assert_eq!(exponential_backoff(1, 1.0, 2.0, 60.0, false, &mut rng), 2.0);
        assert_eq!(exponential_backoff(3, 0.5, 3.0, 60.0, false, &mut rng), 13.5);
        assert_eq!(exponential_backoff(10, 1.0, 2.0, 60.0, false, &mut rng), 60.0);
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for attempt in 0..12 {
            for _ in 0..50 {
                let delay = exponential_backoff(attempt, 1.0, 2.0, 30.0, true, &mut rng);
                assert!((0.0..=30.0).contains(&delay), "delay {} out of range", delay);

                let nominal = 2f64.powi(attempt as i32).min(30.0);
                assert!(delay >= nominal * 0.75 - 1e-9);
            }
        }
    }

    #[test]
    fn test_backoff_is_deterministic_for_seed() {
        let a = exponential_backoff(2, 1.0, 2.0, 60.0, true, &mut StdRng::seed_from_u64(9));
        let b = exponential_backoff(2, 1.0, 2.0, 60.0, true, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_backoff_never_negative() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(exponential_backoff(0, -5.0, 2.0, 10.0, true, &mut rng), 0.0);
        assert_eq!(exponential_backoff(0, 1.0, 2.0, -1.0, false, &mut rng), 0.0);
    }

    #[test]
    fn test_policy_delay_without_jitter() {
        let policy = RetryPolicy::new(5).without_jitter();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retry_async_recovers_from_transient() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_async(
            &fast_policy(3),
            "flaky",
            |e: &TestError| *e == TestError::Transient,
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(n)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_async_fatal_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), TestError> = retry_async(
            &fast_policy(5),
            "fatal",
            |e: &TestError| *e == TestError::Transient,
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            },
        )
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_async_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), TestError> = retry_async(
            &fast_policy(4),
            "always",
            |_| true,
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            },
        )
        .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_retry_blocking() {
        let mut calls = 0;
        let result = retry_blocking(&fast_policy(3), "blocking", |_: &TestError| true, || {
            calls += 1;
            if calls < 3 {
                Err(TestError::Transient)
            } else {
                Ok("done")
            }
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_blocking_zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result: Result<(), TestError> =
            retry_blocking(&fast_policy(0), "zero", |_| true, || {
                calls += 1;
                Err(TestError::Transient)
            });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
