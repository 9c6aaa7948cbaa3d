//! Retry wrapper for single API calls.
//!
//! Throttled (429) and busy (500/502/503/504) responses are retried with a
//! linear backoff of `attempt × base_delay`, stretched to the server's
//! `Retry-After` hint when that is longer and capped at `max_delay`.
//! Permanent errors are returned on the first failure.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::context::CancelFlag;
use crate::error::{ApiError, FetchError};

/// Retry budget for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the call runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Longest single wait, whatever the server asks for.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts.
    #[cfg(test)]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.base_delay.saturating_mul(attempt);
        let wanted = match retry_after {
            Some(hint) => hint.max(computed),
            None => computed,
        };

        if wanted > self.max_delay {
            warn!(
                "Retry delay of {} seconds exceeds max, capping at {} seconds",
                wanted.as_secs(),
                self.max_delay.as_secs()
            );
            return self.max_delay;
        }
        wanted
    }
}

/// Run `call`, retrying transient failures according to `policy`.
///
/// `operation` names the call in progress lines and in the final error.
/// A backoff wait ends early with [`FetchError::Cancelled`] once `cancel` is set.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    cancel: &CancelFlag,
    mut call: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => err,
            Err(err) => return Err(FetchError::Api(err)),
        };

        attempt += 1;
        if attempt > policy.max_retries {
            error!(
                "{} failed after {} attempts, giving up: {}",
                operation, attempt, err
            );
            return Err(FetchError::RetryLimitExceeded {
                operation: operation.to_string(),
                attempts: attempt,
                last: err,
            });
        }

        let delay = policy.delay_for(attempt, err.retry_after());
        warn!(
            "{}: {}, retry {}/{} in {:?}",
            operation, err, attempt, policy.max_retries, delay
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                warn!("{}: cancelled while waiting to retry", operation);
                return Err(FetchError::Cancelled {
                    operation: operation.to_string(),
                });
            }
        }
    }
}
