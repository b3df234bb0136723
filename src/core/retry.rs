// src/core/retry.rs
//! Retry with exponential backoff for idempotent calls.
//!
//! Delay before attempt `n + 1` is `base_delay * 2^(n - 1)`. Client errors
//! (4xx) are final except 429; status-less failures are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::errors::{ApiError, ErrorInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// 429 and non-4xx statuses are transient, as is a missing status.
pub fn status_is_retryable(status: Option<u16>) -> bool {
    match status {
        Some(429) => true,
        Some(status) => !(400..500).contains(&status),
        None => true,
    }
}

/// Errors that may carry an HTTP status.
pub trait RetryableError {
    fn status_code(&self) -> Option<u16>;

    fn is_retryable(&self) -> bool {
        status_is_retryable(self.status_code())
    }
}

impl RetryableError for ApiError {
    fn status_code(&self) -> Option<u16> {
        self.status()
    }

    fn is_retryable(&self) -> bool {
        match self {
            // A malformed body or a local session problem will not fix itself.
            ApiError::Parse(_)
            | ApiError::Session(_)
            | ApiError::Storage(_)
            | ApiError::InvalidRequest(_) => false,
            _ => status_is_retryable(self.status()),
        }
    }
}

impl RetryableError for ErrorInfo {
    fn status_code(&self) -> Option<u16> {
        self.status_code
    }
}

pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !err.is_retryable() {
                    return Err(err);
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
