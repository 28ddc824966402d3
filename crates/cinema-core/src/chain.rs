//! Continuity chain: segments generated one after another, each seeded
//! with the last frame of the previous segment.
//!
//! The chain stops at the first segment without an artifact, since later
//! segments could no longer continue from it. Segments already on disk
//! are skipped but still hand their last frame to the next one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::driver::DriverSettings;
use crate::events::EventSender;
use crate::media::MediaTools;
use crate::outcome::{BatchReport, FailureReason, JobOutcome, JobStatus};
use crate::provider::GenerationProvider;
use crate::scheduler::JobContext;
use crate::script::SegmentSpec;
use crate::storage::{segment_path, ArtifactWriter};

pub struct ContinuityChain {
    job: JobContext,
    media: Arc<dyn MediaTools>,
}

impl ContinuityChain {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        writer: Arc<ArtifactWriter>,
        media: Arc<dyn MediaTools>,
        settings: DriverSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job: JobContext {
                provider,
                writer,
                settings: Arc::new(settings),
                cancel,
                events: None,
            },
            media,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.job.events = Some(events);
        self
    }

    /// Run the chain over `specs` in order. One outcome per spec.
    pub async fn run(&self, specs: &[SegmentSpec], output_dir: &Path) -> BatchReport {
        tracing::info!(segments = specs.len(), "starting continuity chain");
        let mut outcomes = Vec::with_capacity(specs.len());
        let mut previous_frame: Option<PathBuf> = None;
        let mut broken_at: Option<usize> = None;

        for (pos, spec) in specs.iter().enumerate() {
            let is_last = pos + 1 == specs.len();
            let dest = segment_path(output_dir, spec.index);
            let status = if let Some(at) = broken_at {
                JobStatus::Failed(FailureReason::ChainBroken(at))
            } else if let Some(skipped) = self.job.existing(spec.index, &dest).await {
                skipped
            } else if self.job.cancel.is_cancelled() {
                self.job.cancelled(spec.index).await
            } else {
                self.job.generate(spec, previous_frame.take(), &dest).await
            };

            match status.clone() {
                JobStatus::Succeeded(path) | JobStatus::Skipped(path) if !is_last => {
                    previous_frame = self.last_frame(spec, &path).await;
                }
                JobStatus::Succeeded(_) | JobStatus::Skipped(_) => {}
                JobStatus::Failed(FailureReason::ChainBroken(_)) | JobStatus::Cancelled => {}
                JobStatus::Failed(reason) => {
                    tracing::warn!(segment = %spec.label(), "chain stops here: {}", reason);
                    broken_at = Some(spec.index);
                }
            }
            outcomes.push(JobOutcome {
                segment_index: spec.index,
                status,
            });
        }

        let report = BatchReport { outcomes };
        let s = report.summary();
        tracing::info!(
            succeeded = s.succeeded,
            skipped = s.skipped,
            failed = s.failed,
            cancelled = s.cancelled,
            "chain finished"
        );
        report
    }

    /// Frame for the next segment; a failed extraction only loses continuity.
    async fn last_frame(&self, spec: &SegmentSpec, video: &Path) -> Option<PathBuf> {
        match self.media.extract_last_frame(video).await {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(segment = %spec.label(), "no last frame, next segment starts fresh: {:#}", e);
                None
            }
        }
    }
}
