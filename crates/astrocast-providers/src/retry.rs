//! Retry with exponential back-off for a single provider.
//!
//! [`retry_with_backoff`] runs an attempt up to `max_attempts` times. Only
//! retriable errors (see [`ProviderError::is_retriable`]) consume another
//! attempt; anything else ends the provider's budget at once so the
//! orchestrator can fall back.

use std::future::Future;
use std::time::Duration;

use astrocast_core::AppConfig;

use crate::cancel::CancelToken;
use crate::error::ProviderError;

/// Per-provider attempt budget and back-off base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is raised to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.provider_max_attempts,
            Duration::from_millis(config.retry_backoff_base_ms),
        )
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    ///
    /// | Attempt | Delay with a 1 s base |
    /// |---------|-----------------------|
    /// | 1       | 1 s                   |
    /// | 2       | 2 s                   |
    /// | 3       | 4 s                   |
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Terminal failure of one provider's retry loop.
#[derive(Debug)]
pub(crate) struct Exhausted {
    pub error: ProviderError,
    /// Attempts actually started.
    pub attempts: u32,
}

/// Runs `operation(attempt)` until it succeeds, fails non-retriably, or the
/// budget is spent. No delay follows the final attempt.
///
/// Cancellation is observed before each attempt, while an attempt is in
/// flight, and during back-off sleeps; it surfaces as
/// [`ProviderError::Cancelled`].
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut operation: F,
) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(Exhausted {
                error: ProviderError::Cancelled,
                attempts: attempt,
            });
        }
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = operation(attempt) => result,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if matches!(err, ProviderError::Cancelled)
            || !err.is_retriable()
            || attempt >= policy.max_attempts
        {
            return Err(Exhausted {
                error: err,
                attempts: attempt,
            });
        }

        let delay = policy.delay_after(attempt);
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "provider transient error, retrying after back-off"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Exhausted {
                    error: ProviderError::Cancelled,
                    attempts: attempt,
                });
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}
