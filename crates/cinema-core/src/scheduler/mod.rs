//! Batch scheduling: fan segments out as concurrent jobs behind one limiter.

mod batch;
mod job;
mod limiter;

pub use batch::BatchOrchestrator;
pub use limiter::{ConcurrencyLimiter, LimiterPermit};

pub(crate) use job::JobContext;
