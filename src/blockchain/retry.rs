use crate::config::RetryConfig;
use crate::error::{HistoryError, Result};
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff that only reacts to rate-limit failures.
/// The wait before retry `n` (0-based) is `base_delay * 2^n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        let retries = self.max_attempts.saturating_sub(1);
        let longest = self
            .base_delay
            .saturating_mul(1u32 << retries.min(20) as u32);

        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(longest)
            .with_factor(2.0)
            .with_max_times(retries)
    }
}

/// Run `operation`, retrying rate-limited failures per `policy`. Any other
/// failure propagates on first occurrence; running out of attempts on a
/// rate limit yields [`HistoryError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !policy.enabled {
        return operation().await;
    }

    let mut retry = 0;
    let result = operation
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &HistoryError| e.is_rate_limited())
        .notify(|e: &HistoryError, delay: Duration| {
            retry += 1;
            warn!(
                "[{}] rate limited ({}), retry {}/{} in {:?}",
                operation_name,
                e,
                retry,
                policy.max_attempts - 1,
                delay
            );
        })
        .await;

    match result {
        Err(e) if e.is_rate_limited() => Err(HistoryError::RetriesExhausted {
            attempts: policy.max_attempts,
        }),
        other => other,
    }
}
