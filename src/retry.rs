//! Retry policy: exponential backoff with jitter, classifying errors by [`Cause`].
//!
//! The retry-eligibility rule matches against the sentinel [`Cause`] model
//! in [`crate::error`] rather than `Error` variant/message text, so a
//! provider adapter only needs to classify its own failures once.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Configuration for retry behavior. Contract: `next_delay(attempt, error) ->
/// (delay, should_retry)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Symmetric jitter factor in `[0.0, 1.0]`; final delay is scaled by a
    /// random factor in `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// `next_delay(attempt, error) -> (delay, should_retry)`.
    ///
    /// `attempt` is zero-based (0 = first failure, about to retry for the
    /// first time). Non-retryable errors never retry regardless of attempt
    /// count; retryable errors stop once `max_retries` is exhausted.
    pub fn next_delay(&self, attempt: u32, error: &Error) -> (Duration, bool) {
        if !error.is_retryable() {
            return (Duration::ZERO, false);
        }
        if attempt >= self.max_retries {
            return (Duration::ZERO, false);
        }
        (self.calculate_delay(attempt), true)
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponential = base_ms * self.backoff_multiplier.powi(attempt as i32);
        let capped = exponential.min(self.max_delay.as_millis() as f64);

        let jitter_range = capped * self.jitter;
        let jittered = capped + (rand::random::<f64>() * jitter_range) - (jitter_range / 2.0);

        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

/// Retries an async operation per `policy`, honoring `Cause`-based retry
/// eligibility. Used internally by [`crate::request::ChatRequestBuilder::get_response`];
/// exposed publicly so callers can apply the same policy to their own
/// operations (e.g. the summarization sub-request).
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                let (delay, should_retry) = policy.next_delay(attempt, &err);
                if !should_retry {
                    return Err(err);
                }
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after error: {err}");
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Cause, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn retryable_error() -> Error {
        Error::Provider(ProviderError::new("p", Cause::Server, "boom").with_http_status(500))
    }

    fn non_retryable_error() -> Error {
        Error::Provider(ProviderError::new("p", Cause::BadRequest, "nope").with_http_status(400))
    }

    #[test]
    fn test_default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.jitter, 0.2);
    }

    #[test]
    fn test_next_delay_non_retryable_is_exactly_not_retried() {
        let policy = RetryPolicy::default();
        let (_, should_retry) = policy.next_delay(0, &non_retryable_error());
        assert!(!should_retry);
    }

    #[test]
    fn test_next_delay_retryable_within_budget() {
        let policy = RetryPolicy::default();
        let (_, should_retry) = policy.next_delay(0, &retryable_error());
        assert!(should_retry);
        let (_, should_retry) = policy.next_delay(2, &retryable_error());
        assert!(should_retry);
        let (_, should_retry) = policy.next_delay(3, &retryable_error());
        assert!(!should_retry, "max_retries=3 exhausted after attempt index 3");
    }

    #[test]
    fn test_calculate_delay_grows_and_caps() {
        let policy = RetryPolicy::default().with_jitter(0.0);
        let d0 = policy.calculate_delay(0);
        let d1 = policy.calculate_delay(1);
        let d10 = policy.calculate_delay(10);
        assert!(d1 > d0);
        assert!(d10 <= policy.max_delay);
    }

    #[tokio::test]
    async fn test_retry_with_backoff_succeeds_eventually() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result = retry_with_backoff(&policy, move || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(retryable_error())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_with_backoff_non_retryable_fails_fast() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result: Result<i32> = retry_with_backoff(&policy, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(non_retryable_error())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
