//! Per-segment pipeline shared by the batch and the continuity chain:
//! skip check, drive to completion, persist the artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::driver::{DriveResult, DriverSettings, JobDriver};
use crate::events::{emit, EventSender, JobEvent};
use crate::outcome::{FailureReason, JobStatus};
use crate::provider::{GenerationProvider, SubmitRequest};
use crate::script::SegmentSpec;
use crate::storage::{self, ArtifactState, ArtifactWriter};

/// Shared handles a job needs; cloned into every spawned task.
#[derive(Clone)]
pub(crate) struct JobContext {
    pub(crate) provider: Arc<dyn GenerationProvider>,
    pub(crate) writer: Arc<ArtifactWriter>,
    pub(crate) settings: Arc<DriverSettings>,
    pub(crate) cancel: CancellationToken,
    pub(crate) events: Option<EventSender>,
}

impl JobContext {
    /// `Some(Skipped)` when the artifact already exists on disk.
    pub(crate) async fn existing(&self, segment: usize, dest: &Path) -> Option<JobStatus> {
        match storage::inspect(dest) {
            ArtifactState::Complete(size) => {
                tracing::info!(segment = %crate::script::segment_label(segment), size, "already generated, skipping");
                emit(
                    self.events.as_ref(),
                    JobEvent::Skipped {
                        segment,
                        path: dest.to_path_buf(),
                    },
                )
                .await;
                Some(JobStatus::Skipped(dest.to_path_buf()))
            }
            ArtifactState::Partial => {
                tracing::debug!(dest = %dest.display(), "leftover partial artifact will be replaced");
                None
            }
            ArtifactState::Missing => None,
        }
    }

    /// Drive the segment to a terminal result and write its artifact to `dest`.
    pub(crate) async fn generate(
        &self,
        spec: &SegmentSpec,
        start_frame: Option<PathBuf>,
        dest: &Path,
    ) -> JobStatus {
        let request = SubmitRequest::from_spec(spec, start_frame);
        let driver = JobDriver::new(self.provider.as_ref(), &self.settings, &self.cancel)
            .with_events(self.events.as_ref());
        let locator = match driver.drive(&request).await {
            DriveResult::Succeeded(locator) => locator,
            DriveResult::Failed(reason) => return JobStatus::Failed(reason),
            DriveResult::Cancelled => return JobStatus::Cancelled,
        };

        match self.writer.write(&locator, dest).await {
            Ok(()) => {
                tracing::info!(segment = %spec.label(), dest = %dest.display(), "artifact saved");
                emit(
                    self.events.as_ref(),
                    JobEvent::Saved {
                        segment: spec.index,
                        path: dest.to_path_buf(),
                    },
                )
                .await;
                JobStatus::Succeeded(dest.to_path_buf())
            }
            Err(e) => {
                let reason = FailureReason::Write(format!("{:#}", e));
                tracing::error!(segment = %spec.label(), "generated but not saved: {:#}", e);
                emit(
                    self.events.as_ref(),
                    JobEvent::Failed {
                        segment: spec.index,
                        reason: reason.to_string(),
                    },
                )
                .await;
                JobStatus::Failed(reason)
            }
        }
    }

    pub(crate) async fn cancelled(&self, segment: usize) -> JobStatus {
        emit(self.events.as_ref(), JobEvent::Cancelled { segment }).await;
        JobStatus::Cancelled
    }
}
