//! Job driver: turns one segment's submit request into one terminal result.
//!
//! Outer loop: submit, then poll until the operation is done; a transient
//! failure (submit error or overloaded operation) backs off and resubmits
//! while attempts remain, a hard failure ends the job at once. Inner loop:
//! poll on a fixed tick; a failed poll call is logged and retried on the next
//! tick. Every wait also listens for cancellation and the optional deadline.

mod wait;

use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::CinemaConfig;
use crate::events::{emit, EventSender, JobEvent};
use crate::operation::{ArtifactLocator, OperationHandle, OperationState};
use crate::outcome::FailureReason;
use crate::provider::{
    classify_provider_error, classify_remote_error, FailureKind, GenerationProvider, SubmitRequest,
};
use crate::retry::{FailureStage, RetryDecision, RetryPolicy};
use crate::script::segment_label;

use self::wait::Wake;

/// Timing and retry knobs for drivers of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    /// Wall-clock limit per job across all attempts (None = unbounded).
    pub deadline: Option<Duration>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            deadline: None,
        }
    }
}

impl DriverSettings {
    pub fn from_config(cfg: &CinemaConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            retry: RetryPolicy::from_config(&cfg.retry_or_default()),
            deadline: cfg.job_deadline(),
        }
    }
}

/// Terminal result of driving one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveResult {
    Succeeded(ArtifactLocator),
    Failed(FailureReason),
    Cancelled,
}

/// Drives a single job. Cheap to construct; one per segment.
pub struct JobDriver<'a> {
    provider: &'a dyn GenerationProvider,
    settings: &'a DriverSettings,
    cancel: &'a CancellationToken,
    events: Option<&'a EventSender>,
}

impl<'a> JobDriver<'a> {
    pub fn new(
        provider: &'a dyn GenerationProvider,
        settings: &'a DriverSettings,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            provider,
            settings,
            cancel,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Option<&'a EventSender>) -> Self {
        self.events = events;
        self
    }

    /// Run the job to a terminal result.
    pub async fn drive(&self, request: &SubmitRequest) -> DriveResult {
        let segment = request.segment_index;
        let result = self.run(request).await;
        match &result {
            DriveResult::Succeeded(_) => {
                emit(self.events, JobEvent::Completed { segment }).await;
            }
            DriveResult::Failed(reason) => {
                tracing::error!(segment = %segment_label(segment), "job failed: {}", reason);
                emit(
                    self.events,
                    JobEvent::Failed {
                        segment,
                        reason: reason.to_string(),
                    },
                )
                .await;
            }
            DriveResult::Cancelled => {
                tracing::info!(segment = %segment_label(segment), "job cancelled");
                emit(self.events, JobEvent::Cancelled { segment }).await;
            }
        }
        result
    }

    async fn run(&self, request: &SubmitRequest) -> DriveResult {
        let segment = request.segment_index;
        let label = segment_label(segment);
        let deadline = self.settings.deadline.map(|d| Instant::now() + d);
        let mut attempt: u32 = 1;

        loop {
            if self.cancel.is_cancelled() {
                return DriveResult::Cancelled;
            }
            if deadline.is_some_and(|at| Instant::now() >= at) {
                return self.deadline_failure();
            }

            tracing::info!(segment = %label, attempt, "submitting generation request");
            let submitted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return DriveResult::Cancelled,
                r = self.provider.submit(request) => r,
            };

            let handle = match submitted {
                Ok(handle) => handle,
                Err(e) => {
                    let kind = classify_provider_error(&e);
                    tracing::warn!(segment = %label, attempt, ?kind, "submit failed: {}", e);
                    match self.settings.retry.decide(attempt, FailureStage::Submit, kind) {
                        RetryDecision::NoRetry => {
                            return DriveResult::Failed(match kind {
                                FailureKind::Hard => FailureReason::Rejected(e.to_string()),
                                FailureKind::Transient => FailureReason::AttemptsExhausted {
                                    attempts: attempt,
                                    last_error: e.to_string(),
                                },
                            });
                        }
                        RetryDecision::RetryAfter(delay) => {
                            if let Some(stop) = self
                                .backoff(segment, attempt, delay, e.to_string(), deadline)
                                .await
                            {
                                return stop;
                            }
                            attempt += 1;
                            continue;
                        }
                    }
                }
            };

            tracing::info!(segment = %label, attempt, remote_id = %handle.remote_id, "operation started");
            emit(
                self.events,
                JobEvent::Submitted {
                    segment,
                    attempt,
                    remote_id: handle.remote_id.clone(),
                },
            )
            .await;

            let finished = match self.poll_until_done(handle, deadline, segment).await {
                Ok(h) => h,
                Err(stop) => return stop,
            };

            let detail = match finished.state() {
                OperationState::Succeeded(artifact) => {
                    tracing::info!(segment = %label, remote_id = %finished.remote_id, "operation succeeded");
                    return DriveResult::Succeeded(artifact.clone());
                }
                OperationState::Failed(detail) => detail.clone(),
                // `poll_until_done` only hands back finished handles.
                OperationState::Empty | OperationState::Running => {
                    return DriveResult::Failed(FailureReason::EmptyResult)
                }
            };

            let kind = classify_remote_error(&detail);
            if kind == FailureKind::Hard {
                return DriveResult::Failed(FailureReason::Generation(detail.to_string()));
            }
            match self
                .settings
                .retry
                .decide(attempt, FailureStage::Operation, kind)
            {
                RetryDecision::NoRetry => {
                    return DriveResult::Failed(FailureReason::AttemptsExhausted {
                        attempts: attempt,
                        last_error: detail.to_string(),
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(segment = %label, attempt, "provider overloaded: {}", detail);
                    if let Some(stop) = self
                        .backoff(segment, attempt, delay, detail.to_string(), deadline)
                        .await
                    {
                        return stop;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Poll on a fixed tick until the operation reports done.
    async fn poll_until_done(
        &self,
        mut handle: OperationHandle,
        deadline: Option<Instant>,
        segment: usize,
    ) -> Result<OperationHandle, DriveResult> {
        let label = segment_label(segment);
        let period = self.settings.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DriveResult::Cancelled),
                _ = wait::deadline_reached(deadline) => {
                    tracing::warn!(segment = %label, remote_id = %handle.remote_id, "job deadline reached while polling");
                    return Err(self.deadline_failure());
                }
                _ = ticker.tick() => {}
            }

            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DriveResult::Cancelled),
                r = self.provider.poll(&handle) => r,
            };
            match polled {
                Ok(next) => {
                    handle = next;
                    if handle.state() != OperationState::Running {
                        return Ok(handle);
                    }
                    tracing::trace!(segment = %label, "still running");
                }
                Err(e) => {
                    tracing::warn!(segment = %label, "poll check failed (will retry): {}", e);
                    emit(
                        self.events,
                        JobEvent::PollFailed {
                            segment,
                            error: e.to_string(),
                        },
                    )
                    .await;
                }
            }
        }
    }

    /// Announce and wait out a backoff. `Some` means stop with that result.
    async fn backoff(
        &self,
        segment: usize,
        attempt: u32,
        delay: Duration,
        reason: String,
        deadline: Option<Instant>,
    ) -> Option<DriveResult> {
        emit(
            self.events,
            JobEvent::Retrying {
                segment,
                attempt,
                delay,
                reason,
            },
        )
        .await;
        match wait::sleep(delay, self.cancel, deadline).await {
            Wake::Elapsed => None,
            Wake::Cancelled => Some(DriveResult::Cancelled),
            Wake::DeadlineExceeded => Some(self.deadline_failure()),
        }
    }

    fn deadline_failure(&self) -> DriveResult {
        DriveResult::Failed(FailureReason::DeadlineExceeded(
            self.settings.deadline.unwrap_or_default(),
        ))
    }
}
