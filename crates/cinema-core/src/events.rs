//! Progress events emitted while a batch runs.
//!
//! Drivers and the orchestrator send these over an optional bounded channel;
//! the CLI turns them into progress lines. A closed channel is ignored.

use std::path::PathBuf;
use std::time::Duration;

use crate::script::segment_label;

/// One observable step in a segment's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Artifact already on disk; segment will not be generated.
    Skipped { segment: usize, path: PathBuf },
    /// Submit succeeded and the remote operation is running.
    Submitted {
        segment: usize,
        attempt: u32,
        remote_id: String,
    },
    /// A poll call failed; the next tick will try again.
    PollFailed { segment: usize, error: String },
    /// Waiting `delay` before resubmitting.
    Retrying {
        segment: usize,
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    /// Remote operation produced a video.
    Completed { segment: usize },
    /// Artifact written to its final path.
    Saved { segment: usize, path: PathBuf },
    /// Segment reached a terminal failure.
    Failed { segment: usize, reason: String },
    /// Segment stopped because the run was cancelled.
    Cancelled { segment: usize },
}

impl JobEvent {
    pub fn segment(&self) -> usize {
        match self {
            JobEvent::Skipped { segment, .. }
            | JobEvent::Submitted { segment, .. }
            | JobEvent::PollFailed { segment, .. }
            | JobEvent::Retrying { segment, .. }
            | JobEvent::Completed { segment }
            | JobEvent::Saved { segment, .. }
            | JobEvent::Failed { segment, .. }
            | JobEvent::Cancelled { segment } => *segment,
        }
    }

    /// One-line human description, prefixed with the segment label.
    pub fn describe(&self) -> String {
        let label = segment_label(self.segment());
        match self {
            JobEvent::Skipped { path, .. } => {
                format!("[{}] already done: {}", label, path.display())
            }
            JobEvent::Submitted {
                attempt, remote_id, ..
            } => format!("[{}] started (attempt {}): {}", label, attempt, remote_id),
            JobEvent::PollFailed { error, .. } => {
                format!("[{}] poll failed, will retry: {}", label, error)
            }
            JobEvent::Retrying {
                attempt,
                delay,
                reason,
                ..
            } => format!(
                "[{}] attempt {} failed ({}); retrying in {}s",
                label,
                attempt,
                reason,
                delay.as_secs()
            ),
            JobEvent::Completed { .. } => format!("[{}] generation complete", label),
            JobEvent::Saved { path, .. } => format!("[{}] saved {}", label, path.display()),
            JobEvent::Failed { reason, .. } => format!("[{}] failed: {}", label, reason),
            JobEvent::Cancelled { .. } => format!("[{}] cancelled", label),
        }
    }
}

/// Sender half handed to drivers and the orchestrator.
pub type EventSender = tokio::sync::mpsc::Sender<JobEvent>;

/// Send if a channel is attached; a dropped receiver is not an error.
pub(crate) async fn emit(events: Option<&EventSender>, event: JobEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
