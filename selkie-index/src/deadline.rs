//! Deadline composition and cancellable bounding of network operations.
//!
//! Every suspension point that touches the network (a connect, a single
//! write, a single read) is bounded individually: the configured timeout
//! is merged with an optional caller-supplied deadline into one effective
//! deadline for that operation only, and the operation is raced against
//! the caller's cancellation token so cancelling never waits out a
//! timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::IndexError;

/// The tighter of `now + timeout` and the caller's own deadline.
///
/// Recomputed per operation, so a retry gets a fresh timeout window while
/// the caller's deadline keeps shrinking towards it.
pub fn effective_deadline(timeout: Duration, caller: Option<Instant>) -> Instant {
    let configured = Instant::now() + timeout;
    match caller {
        Some(deadline) if deadline < configured => deadline,
        _ => configured,
    }
}

/// Run `fut` bounded by `deadline` and `cancel`.
///
/// Cancellation wins over the deadline and surfaces verbatim as
/// [`IndexError::Cancelled`]; reaching the deadline yields a retryable
/// [`IndexError::Timeout`] naming `what`.
pub(crate) async fn bounded<T, F>(
    what: &str,
    deadline: Instant,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, IndexError>
where
    F: Future<Output = Result<T, IndexError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(IndexError::Cancelled),
        () = tokio::time::sleep_until(deadline) => Err(IndexError::Timeout(what.to_owned())),
        result = fut => result,
    }
}
