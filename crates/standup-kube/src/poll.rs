//! Fixed-interval polling until a condition holds
//!
//! Every wait in standup goes through [`retry`]: the operation is invoked
//! until it succeeds, fails permanently, or runs out of attempts.
//!
//! ```ignore
//! use standup_kube::poll::{policy, retry, RetryError};
//!
//! retry(&policy::STANDARD, "release ready", || async {
//!     let release = store.get(&name).await.map_err(RetryError::Permanent)?;
//!     classify_release(&release)
//! })
//! .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Outcome of a failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    /// Not there yet, try again after the interval
    Transient(E),
    /// Stop polling and return the error
    Permanent(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Transient(e) | RetryError::Permanent(e) => e,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, RetryError::Permanent(_))
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Transient(e) => write!(f, "{}", e),
            RetryError::Permanent(e) => write!(f, "permanent: {}", e),
        }
    }
}

/// How often, and how many times, to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between two attempts
    pub interval: Duration,
    /// `None` polls until the process is killed
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    pub const fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Policies used by the standup commands
pub mod policy {
    use super::RetryPolicy;
    use std::time::Duration;

    pub const INTERVAL: Duration = Duration::from_secs(20);

    /// 60 attempts, 20 seconds apart
    pub const STANDARD: RetryPolicy = RetryPolicy::bounded(INTERVAL, 60);

    /// Every 20 seconds until the CI task deadline
    pub const UNBOUNDED: RetryPolicy = RetryPolicy::unbounded(INTERVAL);

    /// Once a minute until the CI task deadline
    pub const LONG_POLL: RetryPolicy = RetryPolicy::unbounded(Duration::from_secs(60));
}

/// Run `operation` until it succeeds, fails permanently or exhausts `policy`
///
/// With `max_attempts: Some(n)` the operation is invoked at most `n` times and
/// the last error is returned. There is no sleep after the final attempt.
pub async fn retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                debug!(operation = %operation_name, attempt, "condition met");
                return Ok(value);
            }
            Err(RetryError::Permanent(e)) => {
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    "permanent failure, giving up"
                );
                return Err(e);
            }
            Err(RetryError::Transient(e)) => {
                if policy.exhausted(attempt) {
                    warn!(
                        operation = %operation_name,
                        attempt,
                        error = %e,
                        "condition not met after max attempts"
                    );
                    return Err(e);
                }

                debug!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    delay_secs = policy.interval.as_secs(),
                    "condition not met, retrying"
                );
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        (count.clone(), count)
    }

    #[tokio::test]
    async fn test_succeeds_immediately() {
        let policy = RetryPolicy::bounded(Duration::ZERO, 3);
        let result: Result<i32, String> = retry(&policy, "op", || async { Ok(42) }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_budget_is_exact() {
        let (count, c) = counter();
        let policy = RetryPolicy::bounded(Duration::from_secs(20), 3);

        let result: Result<(), String> = retry(&policy, "op", || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(RetryError::Transient(format!("attempt {}", n))) }
        })
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(result, Err("attempt 3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_stops_immediately() {
        let (count, c) = counter();
        let policy = RetryPolicy::bounded(Duration::from_secs(20), 3);

        let result: Result<(), &str> = retry(&policy, "op", || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err(RetryError::Permanent("gone")) }
        })
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(result, Err("gone"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let (count, c) = counter();

        let result: Result<u32, &str> = retry(&policy::UNBOUNDED, "op", || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 5 {
                    Err(RetryError::Transient("not yet"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(5));
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_only_between_attempts() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::bounded(Duration::from_secs(20), 3);

        let _: Result<(), &str> =
            retry(&policy, "op", || async { Err(RetryError::Transient("no")) }).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(40), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(60), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_after_transient() {
        let (count, c) = counter();

        let result: Result<(), &str> = retry(&policy::STANDARD, "op", || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(RetryError::Transient("not yet"))
                } else {
                    Err(RetryError::Permanent("broken"))
                }
            }
        })
        .await;

        assert_eq!(result, Err("broken"));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_standard_policies() {
        assert_eq!(policy::STANDARD.max_attempts, Some(60));
        assert_eq!(policy::STANDARD.interval, Duration::from_secs(20));
        assert_eq!(policy::UNBOUNDED.max_attempts, None);
        assert_eq!(policy::LONG_POLL.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_retry_error_accessors() {
        let e: RetryError<&str> = RetryError::Permanent("x");
        assert!(e.is_permanent());
        assert_eq!(e.into_inner(), "x");
        assert!(!RetryError::Transient("y").is_permanent());
    }
}
