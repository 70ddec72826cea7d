//! Retry middleware with exponential backoff

use std::time::Duration;

use tracing::{debug, warn};

use crate::{error::TransportError, Result};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial try
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following `attempt` (0-based): `initial * 2^attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as u64 * 2u64.saturating_pow(attempt);
        std::cmp::min(Duration::from_millis(delay_ms), self.max_delay)
    }
}

/// Retry middleware for transport operations
///
/// On exhaustion the last transport error is surfaced unchanged, so a
/// network outage still reads as a network failure to the caller.
pub struct RetryMiddleware {
    config: RetryConfig,
}

impl RetryMiddleware {
    /// Create new retry middleware
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute `operation` with retry on retryable errors
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("request succeeded after {attempt} retries");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        debug!("non-retryable error: {e}");
                        return Err(e);
                    }

                    if attempt < self.config.max_retries {
                        let delay = self.config.calculate_delay(attempt);
                        warn!(
                            "request failed (attempt {}/{}), retrying in {:?}: {}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        unreachable!("retry loop always returns");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_per_attempt() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(500),
            ..Default::default()
        };

        assert_eq!(config.calculate_delay(0), Duration::from_millis(500));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };

        assert!(config.calculate_delay(10) <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let middleware = RetryMiddleware::new(RetryConfig::default());

        let result = middleware
            .execute(|| async { Ok::<_, TransportError>(42) })
            .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let middleware = RetryMiddleware::new(RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            ..Default::default()
        });

        let attempts = AtomicU32::new(0);
        let result = middleware
            .execute(|| async {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TransportError::Timeout(Duration::from_secs(1)))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let middleware = RetryMiddleware::new(RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            ..Default::default()
        });

        let attempts = AtomicU32::new(0);
        let result = middleware
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TransportError::Timeout(Duration::from_secs(1)))
            })
            .await;

        // Initial try plus two retries, and the timeout itself is what
        // the caller sees
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let middleware = RetryMiddleware::new(RetryConfig::default());

        let attempts = AtomicU32::new(0);
        let result = middleware
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TransportError::Status {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(TransportError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_abort_is_never_retried() {
        let middleware = RetryMiddleware::new(RetryConfig::default());

        let attempts = AtomicU32::new(0);
        let result = middleware
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TransportError::Aborted)
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(TransportError::Aborted)));
    }
}
