//! Bounded retry for outbound chain calls
//!
//! Fixed delay between attempts, no jitter. Errors are classified before
//! retrying: permanent failures (reverted transactions, missing mappings)
//! are surfaced immediately instead of burning attempts on a call that
//! cannot succeed.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RelayerConfig;
use crate::error::{ErrorClass, RelayError};
use crate::metrics;

/// Retry policy shared by every outbound chain call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RelayerConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt bound
    /// is exhausted. The last error is returned as-is; the operation is
    /// invoked at most `max_attempts` times.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.class() == ErrorClass::Permanent => {
                    warn!(
                        operation,
                        attempt,
                        error = %err,
                        "Permanent error, not retrying"
                    );
                    return Err(err);
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %err,
                        "Giving up after exhausting retry attempts"
                    );
                    return Err(err);
                }
                Err(err) => {
                    metrics::RETRY_ATTEMPTS.with_label_values(&[operation]).inc();
                    warn!(
                        operation,
                        attempt,
                        max = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying after delay"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let calls = AtomicU32::new(0);
        let result = quick_policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RelayError>(7u32) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let calls = AtomicU32::new(0);
        let result = quick_policy(3)
            .run("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RelayError::Connection("down".to_string()))
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;
        // Fails twice, succeeds on the third invocation: N+1 calls total.
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = quick_policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RelayError::Transaction("still failing".to_string())) }
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::Transaction(_)));
        // Exactly the bound, no more.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = quick_policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RelayError::Reverted("nonce used".to_string())) }
            })
            .await;
        assert!(matches!(result.unwrap_err(), RelayError::Reverted(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_clamped_to_one() {
        let calls = AtomicU32::new(0);
        let result = quick_policy(0)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RelayError>(()) }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
