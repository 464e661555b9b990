use crate::error::DataError;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::warn;

/// Configuration for exponential backoff retry of a single kline request.
///
/// Owned by the REST collaborator. The pagination layer never retries on its own.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Multiplier applied after each failed attempt.
    pub multiplier: u32,
    /// Maximum number of retry attempts after the first request.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            multiplier: 2,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    /// Policy that issues each request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff to wait before the given 0-based retry attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Execute a future-producing closure, retrying errors accepted by `should_retry`.
    ///
    /// Returns the first success, the first non-retriable error, or the last error once
    /// `max_retries` is exhausted.
    pub async fn execute<F, Fut, T, E>(
        &self,
        should_retry: impl Fn(&E) -> bool,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_retries && should_retry(&error) => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        %error,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying kline request"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Determine whether a [`DataError`] returned by a kline request should be retried.
///
/// Retries on server errors, rate limits (HTTP 429) and IP bans (HTTP 418), and transport
/// timeouts. Client errors (bad request, invalid symbol, etc) are never retried.
pub fn is_retriable_data_error(error: &DataError) -> bool {
    match error {
        DataError::Api { status, .. } => matches!(status, 418 | 429 | 500..=599),
        DataError::Socket(message) => {
            let lower = message.to_lowercase();
            lower.contains("timeout")
                || lower.contains("timed out")
                || lower.contains("connection")
                || lower.contains("429")
                || lower.contains("rate")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            multiplier: 2,
            max_retries: 3,
        }
    }

    fn api_error(status: u16) -> DataError {
        DataError::Api {
            status,
            code: -1,
            message: "error".to_string(),
        }
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(20), Duration::from_secs(30));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_execute_succeeds_after_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<&str, DataError> = fast_policy()
            .execute(is_retriable_data_error, move || {
                let count = attempts_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(api_error(503))
                    } else {
                        Ok("klines")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "klines");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_non_retriable_error_returns_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<(), DataError> = fast_policy()
            .execute(is_retriable_data_error, move || {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(400)) }
            })
            .await;

        assert!(matches!(result, Err(DataError::Api { status: 400, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_exhausts_all_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<(), DataError> = fast_policy()
            .execute(is_retriable_data_error, move || {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(429)) }
            })
            .await;

        assert!(matches!(result, Err(DataError::Api { status: 429, .. })));
        // first request + max_retries (3)
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_none_policy_issues_a_single_request() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<(), DataError> = RetryPolicy::none()
            .execute(is_retriable_data_error, move || {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(500)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_retriable_api_status() {
        for status in [418, 429, 500, 502, 503, 504] {
            assert!(is_retriable_data_error(&api_error(status)), "{status}");
        }
        for status in [400, 401, 403, 404] {
            assert!(!is_retriable_data_error(&api_error(status)), "{status}");
        }
    }

    #[test]
    fn test_is_retriable_socket_errors() {
        assert!(is_retriable_data_error(&DataError::Socket(
            "operation timed out".to_string()
        )));
        assert!(is_retriable_data_error(&DataError::Socket(
            "connection reset by peer".to_string()
        )));
        assert!(!is_retriable_data_error(&DataError::Socket(
            "failed to deserialise response".to_string()
        )));
    }

    #[test]
    fn test_is_retriable_other_variants() {
        assert!(!is_retriable_data_error(&DataError::Conversion(
            "bad row".to_string()
        )));
    }
}
