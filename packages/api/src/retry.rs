//! Bounded exponential backoff for rate-limited calls.
//!
//! [`RetryPolicy::run`] executes an operation at least once. When it fails with
//! [`ErrorKind::RateLimited`](crate::ErrorKind::RateLimited) and attempts remain,
//! the policy sleeps `base_delay * 2^i` (with `i` counting retries from zero)
//! and tries again. Every other failure, and the rate-limit failure of the last
//! attempt, is returned to the caller untouched. Attempts never overlap.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ApiResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait before retry `retry` (zero-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }

    pub async fn run<F, Fut, T>(&self, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut retry = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry + 1 < max_attempts => {
                    let wait = self.delay_for(retry);
                    warn!(
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited, waiting before retry {}/{}",
                        retry + 1,
                        max_attempts
                    );
                    tokio::time::sleep(wait).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
