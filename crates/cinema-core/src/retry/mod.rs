//! Retry and backoff policy for generation jobs.
//!
//! Pure decisions only: given the attempt number and how a failure was
//! classified, say whether to resubmit and how long to wait first. The job
//! driver owns the actual waiting (and its cancellation).

mod policy;

pub use policy::{FailureStage, RetryDecision, RetryPolicy};
