//! Cancellable waits used at every driver suspension point.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Wake {
    Elapsed,
    Cancelled,
    DeadlineExceeded,
}

/// Resolves at `deadline`, or never when there is none.
pub(super) async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Sleep for `delay` unless cancellation or the job deadline comes first.
pub(super) async fn sleep(
    delay: Duration,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Wake {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Wake::Cancelled,
        _ = deadline_reached(deadline) => Wake::DeadlineExceeded,
        _ = tokio::time::sleep(delay) => Wake::Elapsed,
    }
}
