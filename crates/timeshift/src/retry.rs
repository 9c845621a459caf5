// Retry with exponential backoff, shared by time-shift resolution and any
// other retryable external call. Segment downloads use the immediate policy.

use crate::error::EngineError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Bounded retry with a monotonically non-decreasing delay per attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt. Attempt n waits `initial * 2^(n-1)`.
    pub initial_delay: Duration,
    /// Hard cap on the computed delay to prevent unbounded growth.
    pub max_delay: Duration,
}

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(3600);

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Policy with no inter-attempt delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Compute the delay after a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // 2^attempt with a checked shift so attempts >= 32 saturate instead
        // of overflowing the multiplier.
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Execute an async operation under a retry policy.
///
/// The `operation` closure receives the current attempt number (0-indexed).
/// Non-retryable errors (see [`EngineError::is_retryable`]) abort the loop
/// immediately; cancellation is honored both between attempts and while
/// waiting out a backoff delay.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    operation: F,
) -> Result<T, EngineError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    for attempt in 0..policy.max_attempts {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt + 1 >= policy.max_attempts {
                    return Err(e);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    attempt = attempt + 1,
                    max = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient failure"
                );
                if !delay.is_zero() {
                    tokio::select! {
                        _ = token.cancelled() => return Err(EngineError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    Err(EngineError::configuration("retry policy allows no attempts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_exponentially() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn delay_respects_max_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(300),
        };
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(300));
    }

    #[test]
    fn immediate_policy_has_zero_delay() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(5), Duration::ZERO);
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let policy = RetryPolicy::immediate(3);
        let token = CancellationToken::new();
        let result = retry_with_backoff(&policy, &token, |_| async { Ok(42u32) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exhausts_attempts_on_transient_failure() {
        let policy = RetryPolicy::immediate(3);
        let token = CancellationToken::new();
        let attempts = AtomicU32::new(0);
        let result: Result<u32, _> = retry_with_backoff(&policy, &token, |_| {
            attempts.fetch_add(1, Ordering::Relaxed);
            async {
                Err(EngineError::Io {
                    source: std::io::Error::other("connection reset"),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_retryable_failure() {
        let policy = RetryPolicy::immediate(5);
        let token = CancellationToken::new();
        let attempts = AtomicU32::new(0);
        let result: Result<u32, _> = retry_with_backoff(&policy, &token, |_| {
            attempts.fetch_add(1, Ordering::Relaxed);
            async { Err(EngineError::configuration("bad setup")) }
        })
        .await;
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy::immediate(4);
        let token = CancellationToken::new();
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(&policy, &token, |attempt| {
            attempts.fetch_add(1, Ordering::Relaxed);
            async move {
                if attempt < 2 {
                    Err(EngineError::Io {
                        source: std::io::Error::other("timeout"),
                    })
                } else {
                    Ok("uri".to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "uri");
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn respects_cancellation_before_first_attempt() {
        let policy = RetryPolicy::new(10, Duration::from_secs(100));
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<u32, _> =
            retry_with_backoff(&policy, &token, |_| async { Ok(1u32) }).await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
