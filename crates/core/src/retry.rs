//! Retry mechanism with linear jittered backoff
//!
//! Server faults (5xx) are retried up to a fixed attempt budget. Before retry `n` the caller sleeps
//! for a duration drawn uniformly from `[n * floor, n * ceiling)`. Client faults and transport
//! errors are returned on the first attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::operation::{OperationKind, StoreRequest, StoreResponse};
use crate::traits::{StoreBackend, StoreError};

/// Attempts per logical call, first attempt included
pub const MAX_RETRY: u32 = 5;

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_floor_ms: u64,
    pub backoff_ceiling_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY,
            backoff_floor_ms: 300,
            backoff_ceiling_ms: 500,
        }
    }
}

/// Attempt bookkeeping for one logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Retry a fallible store call, sleeping between attempts on server faults
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation` - Name of the store call, for logs and errors
/// * `key` - Key the call is about, for logs and errors
/// * `call` - Async closure issuing the call once
///
/// # Example
/// ```ignore
/// let head = retry_with_backoff(
///     &config,
///     OperationKind::HeadObject,
///     key,
///     || backend.head_object(key),
/// ).await?;
/// ```
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    operation: OperationKind,
    key: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, StoreError>>,
{
    let mut state = RetryState::new(config.max_attempts);

    loop {
        state.attempt += 1;

        match call().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_server_fault() => {
                if state.exhausted() {
                    tracing::error!(
                        operation = %operation,
                        key,
                        attempt = state.attempt,
                        max_attempts = state.max_attempts,
                        error = %e,
                        "Store call failed, retries exhausted"
                    );
                    return Err(Error::RetriesExhausted {
                        operation,
                        key: key.to_string(),
                        attempts: state.attempt,
                        message: e.to_string(),
                    });
                }

                let backoff = calculate_backoff(config, state.attempt);
                tracing::info!(
                    operation = %operation,
                    key,
                    attempt = state.attempt,
                    max_attempts = state.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Retrying after server fault"
                );

                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e.into_error(operation, key)),
        }
    }
}

/// Backoff before the retry that follows failed attempt `attempt`
fn calculate_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let attempt = u64::from(attempt);
    let floor = attempt * config.backoff_floor_ms;
    let ceiling = attempt * config.backoff_ceiling_ms;

    if ceiling <= floor {
        return Duration::from_millis(floor);
    }
    Duration::from_millis(rand::thread_rng().gen_range(floor..ceiling))
}

/// Check if an error is worth retrying at a higher level
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::RetriesExhausted { .. } => true,
        Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
        ),
        _ => false,
    }
}

/// Runs [`StoreRequest`]s against a shared backend under the retry policy
#[derive(Clone)]
pub struct RetryExecutor {
    backend: Arc<dyn StoreBackend>,
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(backend: Arc<dyn StoreBackend>, config: RetryConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute one logical store call.
    pub async fn execute(&self, request: &StoreRequest) -> Result<StoreResponse> {
        let backend = self.backend.as_ref();
        retry_with_backoff(&self.config, request.kind(), request.key(), move || {
            request.dispatch(backend)
        })
        .await
    }
}

/// Retry configuration builder for easy customization
#[derive(Debug, Clone)]
pub struct RetryBuilder {
    max_attempts: u32,
    backoff_floor_ms: u64,
    backoff_ceiling_ms: u64,
}

impl RetryBuilder {
    pub fn new() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            backoff_floor_ms: defaults.backoff_floor_ms,
            backoff_ceiling_ms: defaults.backoff_ceiling_ms,
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn backoff_floor_ms(mut self, ms: u64) -> Self {
        self.backoff_floor_ms = ms;
        self
    }

    pub fn backoff_ceiling_ms(mut self, ms: u64) -> Self {
        self.backoff_ceiling_ms = ms;
        self
    }

    pub fn build(self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            backoff_floor_ms: self.backoff_floor_ms,
            backoff_ceiling_ms: self.backoff_ceiling_ms,
        }
    }
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockStoreBackend, ObjectHead};
    use tokio::time::Instant;

    fn head(len: u64) -> ObjectHead {
        ObjectHead {
            content_length: len,
            ..Default::default()
        }
    }

    #[test]
    fn test_calculate_backoff_is_linear() {
        let config = RetryConfig::default();

        for attempt in 1..=4u32 {
            for _ in 0..50 {
                let b = calculate_backoff(&config, attempt).as_millis() as u64;
                assert!(b >= u64::from(attempt) * 300, "attempt {attempt}: {b}");
                assert!(b < u64::from(attempt) * 500, "attempt {attempt}: {b}");
            }
        }
    }

    #[test]
    fn test_degenerate_window() {
        let config = RetryBuilder::new()
            .backoff_floor_ms(10)
            .backoff_ceiling_ms(10)
            .build();
        assert_eq!(calculate_backoff(&config, 3), Duration::from_millis(30));
    }

    #[test]
    fn test_retry_builder() {
        let config = RetryBuilder::new()
            .max_attempts(7)
            .backoff_floor_ms(1)
            .backoff_ceiling_ms(2)
            .build();

        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.backoff_floor_ms, 1);
        assert_eq!(config.backoff_ceiling_ms, 2);
        assert_eq!(RetryBuilder::default().build(), RetryConfig::default());
        assert_eq!(RetryConfig::default().max_attempts, 5);
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::RetriesExhausted {
            operation: OperationKind::GetObject,
            key: "/a".into(),
            attempts: 5,
            message: "503".into(),
        }));
        assert!(!is_retryable_error(&Error::NotFound {
            operation: OperationKind::HeadObject,
            key: "/a".into(),
        }));
        assert!(!is_retryable_error(&Error::Unsupported("purge")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_on_fifth_attempt() {
        let mut backend = MockStoreBackend::new();
        let mut calls = 0;
        backend.expect_head_object().times(5).returning(move |_| {
            calls += 1;
            if calls < 5 {
                Err(StoreError::service(503, "Service Unavailable"))
            } else {
                Ok(head(42))
            }
        });
        let executor = RetryExecutor::new(Arc::new(backend), RetryConfig::default());

        let start = Instant::now();
        let response = executor
            .execute(&StoreRequest::Head { key: "/a".into() })
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(response.into_head().unwrap().content_length, 42);
        // Four sleeps: 1..=4 times [300, 500) ms
        assert!(elapsed >= Duration::from_millis(3000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(5000), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let mut backend = MockStoreBackend::new();
        backend
            .expect_delete_object()
            .times(5)
            .returning(|_| Err(StoreError::service(500, "InternalError")));
        let executor = RetryExecutor::new(Arc::new(backend), RetryConfig::default());

        let err = executor
            .execute(&StoreRequest::Delete { key: "/a".into() })
            .await
            .unwrap_err();

        match err {
            Error::RetriesExhausted {
                operation,
                key,
                attempts,
                message,
            } => {
                assert_eq!(operation, OperationKind::DeleteObject);
                assert_eq!(key, "/a");
                assert_eq!(attempts, 5);
                assert!(message.contains("InternalError"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_fault_fails_immediately() {
        let mut backend = MockStoreBackend::new();
        backend
            .expect_head_object()
            .times(1)
            .returning(|_| Err(StoreError::service(404, "NoSuchKey")));
        let executor = RetryExecutor::new(Arc::new(backend), RetryConfig::default());

        let start = Instant::now();
        let err = executor
            .execute(&StoreRequest::Head { key: "/a".into() })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_not_retried() {
        let mut backend = MockStoreBackend::new();
        backend
            .expect_copy_object()
            .times(1)
            .returning(|_, _| Err(StoreError::Transport("connection reset".into())));
        let executor = RetryExecutor::new(Arc::new(backend), RetryConfig::default());

        let err = executor
            .execute(&StoreRequest::Copy {
                src: "/a".into(),
                dst: "/b".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(err.attempts(), Some(1));
    }

    #[tokio::test]
    async fn test_retry_with_backoff_closure() {
        let config = RetryBuilder::new()
            .backoff_floor_ms(1)
            .backoff_ceiling_ms(2)
            .build();
        let counter = std::sync::atomic::AtomicU32::new(0);
        let calls = &counter;

        let result = retry_with_backoff(&config, OperationKind::UploadFile, "/f", || async move {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < 2 {
                Err(StoreError::service(502, "Bad Gateway"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
