//! Terminal per-segment outcomes and the batch report.

use std::path::PathBuf;
use std::time::Duration;

/// Why a segment failed. Write failures are kept distinct from generation
/// failures so "never made" and "made but not saved" can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// Submit refused with a non-retryable error (bad request, auth).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// Remote operation finished with a hard error (e.g. safety filter).
    #[error("generation error: {0}")]
    Generation(String),
    #[error("max attempts exceeded ({attempts}): {last_error}")]
    AttemptsExhausted { attempts: u32, last_error: String },
    #[error("operation finished without a video")]
    EmptyResult,
    #[error("no result within the {}s job deadline", .0.as_secs())]
    DeadlineExceeded(Duration),
    /// Video was generated but could not be persisted.
    #[error("write error: {0}")]
    Write(String),
    /// A continuity chain stopped at an earlier segment.
    #[error("not attempted: segment {0} failed earlier in the chain")]
    ChainBroken(usize),
    /// The job task panicked or was aborted.
    #[error("job task aborted: {0}")]
    Aborted(String),
}

impl FailureReason {
    /// True when the video exists remotely but was not saved.
    pub fn is_write_error(&self) -> bool {
        matches!(self, FailureReason::Write(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded(PathBuf),
    /// Artifact existed before the run; nothing was generated.
    Skipped(PathBuf),
    Failed(FailureReason),
    Cancelled,
}

/// Final result for one segment. Produced once per segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub segment_index: usize,
    pub status: JobStatus,
}

impl JobOutcome {
    /// Path of the segment's artifact, if it exists after the run.
    pub fn artifact(&self) -> Option<&PathBuf> {
        match &self.status {
            JobStatus::Succeeded(p) | JobStatus::Skipped(p) => Some(p),
            _ => None,
        }
    }
}

/// Counts per status, for the final accounting line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Outcomes of a run, one per input segment, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut s = BatchSummary::default();
        for o in &self.outcomes {
            match o.status {
                JobStatus::Succeeded(_) => s.succeeded += 1,
                JobStatus::Skipped(_) => s.skipped += 1,
                JobStatus::Failed(_) => s.failed += 1,
                JobStatus::Cancelled => s.cancelled += 1,
            }
        }
        s
    }

    pub fn was_cancelled(&self) -> bool {
        self.summary().cancelled > 0
    }

    pub fn has_failures(&self) -> bool {
        self.summary().failed > 0
    }

    /// Artifact paths in segment order, only if every segment has one.
    pub fn artifact_paths(&self) -> Option<Vec<PathBuf>> {
        self.outcomes
            .iter()
            .map(|o| o.artifact().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(i: usize, status: JobStatus) -> JobOutcome {
        JobOutcome {
            segment_index: i,
            status,
        }
    }

    #[test]
    fn summary_counts_each_status() {
        let report = BatchReport {
            outcomes: vec![
                outcome(1, JobStatus::Succeeded("a".into())),
                outcome(2, JobStatus::Skipped("b".into())),
                outcome(3, JobStatus::Failed(FailureReason::EmptyResult)),
                outcome(4, JobStatus::Cancelled),
            ],
        };
        let s = report.summary();
        assert_eq!((s.succeeded, s.skipped, s.failed, s.cancelled), (1, 1, 1, 1));
        assert!(report.was_cancelled());
        assert!(report.has_failures());
        assert!(report.artifact_paths().is_none());
    }

    #[test]
    fn artifact_paths_in_order_when_complete() {
        let report = BatchReport {
            outcomes: vec![
                outcome(1, JobStatus::Skipped("s1".into())),
                outcome(2, JobStatus::Succeeded("s2".into())),
            ],
        };
        assert_eq!(
            report.artifact_paths(),
            Some(vec![PathBuf::from("s1"), PathBuf::from("s2")])
        );
    }

    #[test]
    fn reasons_render_distinctly() {
        let write = FailureReason::Write("disk full".into());
        assert!(write.is_write_error());
        assert_eq!(write.to_string(), "write error: disk full");
        let ex = FailureReason::AttemptsExhausted {
            attempts: 3,
            last_error: "code 8: overloaded".into(),
        };
        assert_eq!(
            ex.to_string(),
            "max attempts exceeded (3): code 8: overloaded"
        );
        assert_eq!(
            FailureReason::DeadlineExceeded(Duration::from_secs(600)).to_string(),
            "no result within the 600s job deadline"
        );
    }
}
