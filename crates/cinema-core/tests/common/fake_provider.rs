//! Scripted in-memory generation provider.
//!
//! Each segment gets a queue of attempt behaviours; once a queue is empty
//! the segment succeeds after one poll. Counts submits and polls and tracks
//! how many operations were open at the same time.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cinema_core::operation::{ArtifactLocator, ErrorDetail, OperationHandle};
use cinema_core::provider::{GenerationProvider, ProviderError, SubmitRequest};

/// What one submit attempt of a segment does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Submit call fails; `transient` selects HTTP 503 vs HTTP 400.
    SubmitFails { transient: bool },
    /// Running for `polls` polls, then done with video bytes.
    Succeeds { polls: usize },
    /// First `failing` poll calls error out, then done with video bytes.
    FlakyPolls { failing: usize },
    /// Done after one poll with a transient "overloaded" error.
    Overloaded,
    /// Done after one poll with a hard safety-filter error.
    Blocked,
    /// Done after one poll with neither error nor video.
    Empty,
    /// Done after one poll carrying both a hard error and video bytes.
    BlockedWithVideo,
    /// Never finishes.
    Hangs,
}

struct OpenOp {
    attempt: Attempt,
    polls: usize,
}

#[derive(Default)]
pub struct FakeProvider {
    plans: Mutex<HashMap<usize, VecDeque<Attempt>>>,
    ops: Mutex<HashMap<String, OpenOp>>,
    submit_log: Mutex<Vec<SubmitRequest>>,
    submits: AtomicUsize,
    polls: AtomicUsize,
    open: AtomicUsize,
    max_open: AtomicUsize,
}

pub const VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-video";

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue attempt behaviours for a 1-based segment.
    pub fn plan(self, segment: usize, attempts: impl IntoIterator<Item = Attempt>) -> Self {
        self.plans
            .lock()
            .unwrap()
            .entry(segment)
            .or_default()
            .extend(attempts);
        self
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn submits_for(&self, segment: usize) -> usize {
        self.submit_log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.segment_index == segment)
            .count()
    }

    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.submit_log.lock().unwrap().clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Most operations open at once.
    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    async fn submit(&self, request: &SubmitRequest) -> Result<OperationHandle, ProviderError> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        self.submit_log.lock().unwrap().push(request.clone());
        let attempt = self
            .plans
            .lock()
            .unwrap()
            .get_mut(&request.segment_index)
            .and_then(|q| q.pop_front())
            .unwrap_or(Attempt::Succeeds { polls: 1 });

        if let Attempt::SubmitFails { transient } = attempt {
            let status = if transient { 503 } else { 400 };
            return Err(ProviderError::Http {
                status,
                body: "scripted submit failure".into(),
            });
        }

        let id = format!("operations/seg{}-{}", request.segment_index, n);
        self.ops
            .lock()
            .unwrap()
            .insert(id.clone(), OpenOp { attempt, polls: 0 });
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);
        Ok(OperationHandle::pending(id))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationHandle, ProviderError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut ops = self.ops.lock().unwrap();
        let Some(op) = ops.get_mut(&handle.remote_id) else {
            return Err(ProviderError::Decode(format!("unknown {}", handle.remote_id)));
        };
        op.polls += 1;

        let mut next = OperationHandle::pending(handle.remote_id.clone());
        match &op.attempt {
            Attempt::Hangs => return Ok(next),
            Attempt::Succeeds { polls } if op.polls < *polls => return Ok(next),
            Attempt::FlakyPolls { failing } if op.polls <= *failing => {
                return Err(ProviderError::Transport("connection reset".into()));
            }
            Attempt::Succeeds { .. } | Attempt::FlakyPolls { .. } => {
                next.artifact = Some(ArtifactLocator::Inline(VIDEO.to_vec()));
            }
            Attempt::Overloaded => {
                next.error = Some(ErrorDetail::new(Some(8), "Model is overloaded, try again later"));
            }
            Attempt::Blocked => {
                next.error = Some(ErrorDetail::new(
                    Some(3),
                    "Video blocked by responsible AI filter",
                ));
            }
            Attempt::BlockedWithVideo => {
                next.error = Some(ErrorDetail::new(Some(3), "Video blocked after generation"));
                next.artifact = Some(ArtifactLocator::Inline(VIDEO.to_vec()));
            }
            Attempt::Empty => {}
            Attempt::SubmitFails { .. } => unreachable!("never stored as an operation"),
        }
        next.done = true;
        ops.remove(&handle.remote_id);
        drop(ops);
        self.close();
        Ok(next)
    }
}
