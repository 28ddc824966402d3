//! Remote long-running operation handle.
//!
//! A handle is produced by a provider's submit call and replaced wholesale by
//! each poll; the job driver never merges partial snapshots.

use std::fmt;

/// Error payload reported by a finished remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Provider status code (gRPC-style canonical code for Vertex), if any.
    pub code: Option<i64>,
    /// Human-readable message from the provider.
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "code {}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Where a finished operation's video lives.
#[derive(Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    /// Video bytes returned inline in the poll response.
    Inline(Vec<u8>),
    /// Remote storage URI (e.g. `gs://bucket/object.mp4`) to be fetched.
    Remote(String),
}

impl fmt::Debug for ArtifactLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocator::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            ArtifactLocator::Remote(uri) => f.debug_tuple("Remote").field(uri).finish(),
        }
    }
}

/// Snapshot of a remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    /// Opaque operation name assigned by the provider.
    pub remote_id: String,
    pub done: bool,
    pub error: Option<ErrorDetail>,
    pub artifact: Option<ArtifactLocator>,
}

/// Interpretation of a handle for the driver's state machine.
#[derive(Debug, PartialEq, Eq)]
pub enum OperationState<'a> {
    Running,
    Failed(&'a ErrorDetail),
    Succeeded(&'a ArtifactLocator),
    /// Done, but neither an error nor a video was reported.
    Empty,
}

impl OperationHandle {
    /// Handle for a freshly submitted operation.
    pub fn pending(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            done: false,
            error: None,
            artifact: None,
        }
    }

    pub fn state(&self) -> OperationState<'_> {
        if !self.done {
            return OperationState::Running;
        }
        if let Some(err) = &self.error {
            return OperationState::Failed(err);
        }
        match &self.artifact {
            Some(artifact) => OperationState::Succeeded(artifact),
            None => OperationState::Empty,
        }
    }
}
