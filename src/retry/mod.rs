// Retry module
// Timeout and exponential backoff around calls to external capabilities


use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{RagError, Result};

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    pub attempts: u32,
    pub base_delay_ms: u64,
    /// Upper bound on a single attempt
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
            timeout_seconds: 60,
        }
    }
}

/// The external capability a guarded call talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Embedding,
    Store,
    Chat,
}

impl Capability {
    /// Error reported when a call to this capability does not finish in time
    #[inline]
    pub fn timeout_error(self, timeout: Duration) -> RagError {
        let message = format!("timed out after {:?}", timeout);
        match self {
            Self::Embedding => RagError::EmbeddingFailure(message),
            Self::Store => RagError::StoreUnavailable(message),
            Self::Chat => RagError::ChatCompletionFailure(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
    timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    #[inline]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Single attempt, still bounded by `timeout`
    #[inline]
    pub const fn no_retry(timeout: Duration) -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
            timeout,
        }
    }

    #[inline]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[inline]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up. Each attempt is bounded by the policy
    /// timeout; a timeout counts as a retryable failure of `capability`.
    #[inline]
    pub async fn run<T, F, Fut>(&self, capability: Capability, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            debug!("{:?} call attempt {}/{}", capability, attempt, self.attempts);

            let error = match tokio::time::timeout(self.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error,
                Err(_) => capability.timeout_error(self.timeout),
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= self.attempts {
                error!(
                    "{:?} call failed after {} attempts: {}",
                    capability, attempt, error
                );
                return Err(error);
            }

            let delay = self.delay_for(attempt);
            warn!(
                "{:?} call failed (attempt {}/{}): {}. Retrying in {:?}",
                capability, attempt, self.attempts, error, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
