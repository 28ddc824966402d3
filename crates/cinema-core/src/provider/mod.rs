//! Generation provider seam.
//!
//! The job driver talks to the remote service only through
//! `GenerationProvider`. Raw provider failures are converted into a
//! `FailureKind` here (see `classify`) before the driver acts on them.

mod classify;
pub mod vertex;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::operation::{ErrorDetail, OperationHandle};
use crate::script::{ParameterSet, SegmentSpec};

pub use classify::{classify_http_status, classify_provider_error, classify_remote_error, FailureKind};

/// Everything a provider needs to start one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub segment_index: usize,
    pub prompt: String,
    pub duration_secs: u32,
    pub params: ParameterSet,
    /// First frame to continue from (continuity chaining).
    pub start_frame: Option<PathBuf>,
}

impl SubmitRequest {
    pub fn from_spec(spec: &SegmentSpec, start_frame: Option<PathBuf>) -> Self {
        Self {
            segment_index: spec.index,
            prompt: spec.prompt.clone(),
            duration_secs: spec.duration_secs,
            params: spec.params.clone(),
            start_frame,
        }
    }
}

/// Failure of a submit or poll call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level failure (connect, TLS, timeout).
    #[error("transport: {0}")]
    Transport(String),
    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u32, body: String },
    /// Provider rejected the call with a structured error.
    #[error("remote: {0}")]
    Remote(ErrorDetail),
    /// Response could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
    /// Credentials could not be obtained.
    #[error("auth: {0}")]
    Auth(String),
    /// Request could not be built locally (e.g. unreadable start frame).
    #[error("request: {0}")]
    Request(String),
}

/// Remote long-running generation service.
///
/// `poll` must not mutate remote state and must be safe to call repeatedly.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<OperationHandle, ProviderError>;

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationHandle, ProviderError>;
}
