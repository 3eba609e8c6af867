//! Retry policy shared by the ingestion and query transports.
//!
//! Both transports use the same backoff shape: exponential doubling from
//! an initial delay, capped at a maximum, with a bounded number of
//! retries. The attempt loop sleeps between attempts and abandons the
//! sleep the moment the caller cancels.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::IndexError;

/// Capped exponential backoff. An operation makes `max_attempts + 1`
/// sends in total: the initial attempt plus up to `max_attempts` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay. Treated as `initial_delay` when
    /// configured smaller than it.
    pub max_delay: Duration,
    /// Number of retries after the initial attempt.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry that follows attempt `attempt` (counted
    /// from zero): `min(initial_delay * 2^attempt, cap)`. Saturates
    /// instead of overflowing, so the delay never exceeds the cap.
    pub fn delay(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.max(self.initial_delay);
        let delay = 2u32
            .checked_pow(attempt)
            .map(|factor| self.initial_delay.saturating_mul(factor))
            .unwrap_or(cap);
        delay.min(cap)
    }
}

/// Outcome of a single attempt inside [`with_retries`].
pub(crate) enum Attempt<T> {
    /// The operation reached a conclusion; stop the loop.
    Done(T),
    /// A transient failure; back off and go again while budget remains.
    Retry(IndexError),
    /// A failure retrying cannot fix; stop immediately.
    Fatal(IndexError),
}

/// Drive `op` under `policy` until it concludes or the budget runs out.
///
/// `op` receives the attempt number counted from zero. Cancellation is
/// checked before every attempt and aborts the inter-attempt sleep, so a
/// cancelled caller never waits out a backoff delay.
pub(crate) async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, IndexError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }
        match op(attempt).await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fatal(err) => return Err(err),
            Attempt::Retry(err) => {
                if attempt >= policy.max_attempts {
                    return Err(IndexError::Exhausted {
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
                sleep_cancellable(policy.delay(attempt), cancel).await?;
                attempt += 1;
            }
        }
    }
}

/// Sleep for `delay`, returning early with [`IndexError::Cancelled`] when
/// the token fires first.
pub(crate) async fn sleep_cancellable(
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), IndexError> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = cancel.cancelled() => Err(IndexError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
