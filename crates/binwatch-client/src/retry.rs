//! Bounded retry with exponential backoff.
//!
//! Every transport call in the workspace goes through one policy
//! object instead of re-implementing its own backoff loop. The policy
//! knows nothing about HTTP; it runs any fallible async operation up
//! to a bound, sleeping an increasing delay between failures.
//!
//! Delays use `tokio::time`, so tests run instantly on a paused clock.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::TransportError;

/// Default maximum number of attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy applied to every transport call.
///
/// The delay before retrying grows linearly with the attempt index
/// (`base_delay × attempt`), which for the small attempt counts used
/// here behaves like a gentle exponential backoff without ever
/// overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts before surfacing the failure.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `base_delay × n` before retrying.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy. An attempt bound of zero is treated as one:
    /// every operation runs at least once.
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay,
        }
    }

    /// Delay to wait after the given 1-based attempt fails.
    pub const fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `op` until it succeeds or the policy's attempt bound is hit.
///
/// `op` receives the 1-based attempt index. Only failures `op` reports
/// as `Err` are retried; a well-formed but semantically unsuccessful
/// response must be returned as `Ok` by the caller and is never
/// retried here. After the final failure the error surfaces as
/// [`TransportError::RetriesExhausted`] carrying the last cause.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last: Option<TransportError> = None;

    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                warn!(operation, attempt, attempts, error = %error, "transport attempt failed");
                last = Some(error);
                if attempt < attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    Err(TransportError::RetriesExhausted {
        operation: operation.to_owned(),
        attempts,
        last: last.map(|e| e.to_string()).unwrap_or_default(),
    })
}
