//! Run every segment of a script as its own job, at most `capacity` at once.
//!
//! All jobs are spawned up front on a `JoinSet`; each waits for a limiter
//! slot before it submits anything. Completion order is free, the report
//! is put back into segment order. One job failing never stops the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::driver::DriverSettings;
use crate::events::EventSender;
use crate::outcome::{BatchReport, FailureReason, JobOutcome, JobStatus};
use crate::provider::GenerationProvider;
use crate::script::SegmentSpec;
use crate::storage::ArtifactWriter;

use super::job::JobContext;
use super::limiter::ConcurrencyLimiter;

/// Owns everything one batch run shares between its jobs.
pub struct BatchOrchestrator {
    job: JobContext,
    limiter: Arc<ConcurrencyLimiter>,
}

impl BatchOrchestrator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        writer: Arc<ArtifactWriter>,
        limiter: Arc<ConcurrencyLimiter>,
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
            limiter,
        }
    }

    /// Attach a progress channel.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.job.events = Some(events);
        self
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Generate every segment whose artifact path (from `output_path`, given
    /// the 1-based segment index) does not exist yet.
    /// Returns exactly one outcome per spec, in input order.
    pub async fn run<F>(&self, specs: &[SegmentSpec], output_path: F) -> BatchReport
    where
        F: Fn(usize) -> PathBuf,
    {
        tracing::info!(
            segments = specs.len(),
            capacity = self.limiter.capacity(),
            "starting batch"
        );

        let mut slots: Vec<Option<JobOutcome>> = vec![None; specs.len()];
        let mut tasks = JoinSet::new();

        for (pos, spec) in specs.iter().enumerate() {
            let job = self.job.clone();
            let limiter = Arc::clone(&self.limiter);
            let spec = spec.clone();
            let dest = output_path(spec.index);
            tasks.spawn(async move {
                let status = run_job(&job, &limiter, &spec, &dest).await;
                (
                    pos,
                    JobOutcome {
                        segment_index: spec.index,
                        status,
                    },
                )
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pos, outcome)) => slots[pos] = Some(outcome),
                Err(e) => tracing::error!("segment task ended abnormally: {}", e),
            }
        }

        let outcomes: Vec<JobOutcome> = slots
            .into_iter()
            .zip(specs)
            .map(|(slot, spec)| {
                slot.unwrap_or_else(|| JobOutcome {
                    segment_index: spec.index,
                    status: JobStatus::Failed(FailureReason::Aborted(
                        "task panicked or was aborted".to_string(),
                    )),
                })
            })
            .collect();

        let report = BatchReport { outcomes };
        let s = report.summary();
        tracing::info!(
            succeeded = s.succeeded,
            skipped = s.skipped,
            failed = s.failed,
            cancelled = s.cancelled,
            peak_concurrency = self.limiter.peak(),
            "batch finished"
        );
        report
    }
}

async fn run_job(
    job: &JobContext,
    limiter: &ConcurrencyLimiter,
    spec: &SegmentSpec,
    dest: &Path,
) -> JobStatus {
    if let Some(skipped) = job.existing(spec.index, dest).await {
        return skipped;
    }
    if job.cancel.is_cancelled() {
        return job.cancelled(spec.index).await;
    }
    let Some(_permit) = limiter.acquire(&job.cancel).await else {
        return job.cancelled(spec.index).await;
    };
    job.generate(spec, None, dest).await
}
