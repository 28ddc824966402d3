//! Classify provider failures into transient (retry with backoff) or hard.
//!
//! This is the only place that inspects provider error codes and messages.

use crate::operation::ErrorDetail;

use super::ProviderError;

/// Retry classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Overload, quota, rate limiting: expected to succeed if retried.
    Transient,
    /// Safety rejection, invalid request: retrying cannot help.
    Hard,
}

/// Canonical status codes treated as transient.
/// 4 = DEADLINE_EXCEEDED, 8 = RESOURCE_EXHAUSTED, 14 = UNAVAILABLE.
const TRANSIENT_CODES: &[i64] = &[4, 8, 14];

/// Message fragments (lowercase) that mark an overloaded or throttled provider.
const TRANSIENT_HINTS: &[&str] = &[
    "high load",
    "overloaded",
    "quota",
    "resource exhausted",
    "resource_exhausted",
    "try again",
    "rate limit",
    "temporarily unavailable",
];

/// Classify the error reported by a finished remote operation.
pub fn classify_remote_error(detail: &ErrorDetail) -> FailureKind {
    if let Some(code) = detail.code {
        if TRANSIENT_CODES.contains(&code) || code == 429 || (500..600).contains(&code) {
            return FailureKind::Transient;
        }
    }
    let msg = detail.message.to_lowercase();
    if TRANSIENT_HINTS.iter().any(|hint| msg.contains(hint)) {
        return FailureKind::Transient;
    }
    FailureKind::Hard
}

/// Classify an HTTP status from a submit call.
pub fn classify_http_status(code: u32) -> FailureKind {
    match code {
        408 | 429 => FailureKind::Transient,
        500..=599 => FailureKind::Transient,
        _ => FailureKind::Hard,
    }
}

/// Classify a failed submit/poll call.
pub fn classify_provider_error(e: &ProviderError) -> FailureKind {
    match e {
        ProviderError::Transport(_) | ProviderError::Decode(_) => FailureKind::Transient,
        ProviderError::Http { status, body } => match classify_http_status(*status) {
            FailureKind::Transient => FailureKind::Transient,
            // Vertex reports quota exhaustion on some 4xx bodies too.
            FailureKind::Hard => classify_remote_error(&ErrorDetail::new(None, body.as_str())),
        },
        ProviderError::Remote(detail) => classify_remote_error(detail),
        ProviderError::Auth(_) | ProviderError::Request(_) => FailureKind::Hard,
    }
}
