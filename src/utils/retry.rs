//! Retry utilities with linear backoff for resilient API calls.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::sources::SourceError;

bitflags::bitflags! {
    /// Failure kinds a source is willing to retry
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RetryOn: u32 {
        const TIMEOUT = 1 << 0;
        const GATEWAY_TIMEOUT = 1 << 1;
        const SERVICE_UNAVAILABLE = 1 << 2;
        const SERVER_ERROR = 1 << 3;
        const NETWORK = 1 << 4;
        const TOO_MANY_REQUESTS = 1 << 5;
    }
}

/// Configuration for retry behavior
///
/// The delay before retry `n` (1-based) is `n * backoff_step`, so the
/// defaults wait 2s, 4s and 6s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay unit, multiplied by the retry number
    pub backoff_step: Duration,
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
    /// Which transient failures trigger a retry
    pub retry_on: RetryOn,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step: Duration::from_millis(2000),
            attempt_timeout: Duration::from_secs(10),
            retry_on: RetryOn::TIMEOUT | RetryOn::GATEWAY_TIMEOUT,
        }
    }
}

impl RetryConfig {
    /// Set the number of retries
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff step
    pub fn backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Set the per-attempt timeout
    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Replace the retryable failure kinds
    pub fn retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Delay before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_step.saturating_mul(retry)
    }

    /// Whether this policy retries the given error
    pub fn should_retry(&self, error: &SourceError) -> Option<TransientError> {
        TransientError::from_source_error(error).filter(|t| self.retry_on.contains(t.flag()))
    }
}

/// Transient errors that may trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Server error (5xx)
    ServerError,
    /// Service unavailable (503)
    ServiceUnavailable,
    /// Gateway timeout (504)
    GatewayTimeout,
    /// Too many requests (429)
    TooManyRequests,
    /// Attempt timed out
    Timeout,
}

impl TransientError {
    /// Classify a SourceError; `None` means the error is permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Timeout => Some(TransientError::Timeout),
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Http { status, .. } => match *status {
                429 => Some(TransientError::TooManyRequests),
                503 => Some(TransientError::ServiceUnavailable),
                504 => Some(TransientError::GatewayTimeout),
                500..=599 => Some(TransientError::ServerError),
                _ => None,
            },
            _ => None,
        }
    }

    /// The policy flag that enables retrying this error
    pub fn flag(&self) -> RetryOn {
        match self {
            TransientError::Network => RetryOn::NETWORK,
            TransientError::ServerError => RetryOn::SERVER_ERROR,
            TransientError::ServiceUnavailable => RetryOn::SERVICE_UNAVAILABLE,
            TransientError::GatewayTimeout => RetryOn::GATEWAY_TIMEOUT,
            TransientError::TooManyRequests => RetryOn::TOO_MANY_REQUESTS,
            TransientError::Timeout => RetryOn::TIMEOUT,
        }
    }
}

/// Execute an async operation with retry logic
///
/// Each attempt is bounded by `config.attempt_timeout`; running over counts
/// as [`SourceError::Timeout`]. Attempts run strictly one after another.
///
/// # Returns
///
/// The result of the first successful attempt, the first permanent error,
/// or the last transient error once retries are exhausted
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut retries = 0;

    loop {
        let result = match timeout(config.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout),
        };

        let error = match result {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!("Operation succeeded after {} retries", retries);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let Some(transient) = config.should_retry(&error) else {
            return Err(error);
        };

        if retries >= config.max_retries {
            tracing::warn!(
                "Operation failed after {} attempts: {}",
                retries + 1,
                error
            );
            return Err(error);
        }

        retries += 1;
        let delay = config.delay_for(retries);
        tracing::debug!(
            "Transient error {:?} on attempt {}, retrying in {:?}",
            transient,
            retries,
            delay
        );
        sleep(delay).await;
    }
}
