//! JSON shapes for `predictLongRunning` / `fetchPredictOperation`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::operation::{ArtifactLocator, ErrorDetail, OperationHandle};
use crate::provider::{ProviderError, SubmitRequest};
use crate::script::ParameterSet;

#[derive(Debug, Serialize)]
pub(super) struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    #[serde(flatten)]
    params: &'a ParameterSet,
    duration_seconds: u32,
    sample_count: u32,
}

/// Build the submit body; `start_frame` is the JPEG bytes of the previous
/// segment's last frame, if chaining.
pub(super) fn predict_body(
    request: &SubmitRequest,
    start_frame: Option<&[u8]>,
) -> Result<Vec<u8>, ProviderError> {
    let body = PredictRequest {
        instances: vec![Instance {
            prompt: &request.prompt,
            image: start_frame.map(|bytes| InlineImage {
                bytes_base64_encoded: STANDARD.encode(bytes),
                mime_type: "image/jpeg",
            }),
        }],
        parameters: Parameters {
            params: &request.params,
            duration_seconds: request.duration_secs,
            sample_count: 1,
        },
    };
    serde_json::to_vec(&body).map_err(|e| ProviderError::Request(e.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FetchRequest<'a> {
    pub operation_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartedOperation {
    name: String,
}

/// Extract the operation name from a `predictLongRunning` response.
pub(super) fn parse_started(body: &[u8]) -> Result<OperationHandle, ProviderError> {
    let started: StartedOperation =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    if started.name.is_empty() {
        return Err(ProviderError::Decode("operation name is empty".into()));
    }
    Ok(OperationHandle::pending(started.name))
}

#[derive(Debug, Deserialize)]
struct PolledOperation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<RemoteStatus>,
    #[serde(default)]
    response: Option<GenerateResponse>,
}

#[derive(Debug, Deserialize)]
struct RemoteStatus {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    videos: Vec<Video>,
    rai_media_filtered_count: u32,
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Video {
    gcs_uri: Option<String>,
    bytes_base64_encoded: Option<String>,
}

/// Turn a `fetchPredictOperation` response into a fresh handle.
///
/// The previous handle only contributes its id when the response omits one.
pub(super) fn parse_polled(
    previous: &OperationHandle,
    body: &[u8],
) -> Result<OperationHandle, ProviderError> {
    let polled: PolledOperation =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let remote_id = polled
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| previous.remote_id.clone());
    let mut handle = OperationHandle::pending(remote_id);
    handle.done = polled.done;
    if !polled.done {
        return Ok(handle);
    }

    if let Some(status) = polled.error {
        handle.error = Some(ErrorDetail::new(status.code, status.message));
        return Ok(handle);
    }

    let response = polled.response.unwrap_or_default();
    if let Some(video) = response.videos.into_iter().next() {
        if let Some(encoded) = video.bytes_base64_encoded.filter(|s| !s.is_empty()) {
            let bytes = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| ProviderError::Decode(format!("video bytes: {}", e)))?;
            handle.artifact = Some(ArtifactLocator::Inline(bytes));
        } else if let Some(uri) = video.gcs_uri.filter(|s| !s.is_empty()) {
            handle.artifact = Some(ArtifactLocator::Remote(uri));
        }
    } else if response.rai_media_filtered_count > 0 {
        // Safety filtering finishes "successfully" with no videos.
        let reasons = if response.rai_media_filtered_reasons.is_empty() {
            "output filtered by safety policy".to_string()
        } else {
            response.rai_media_filtered_reasons.join("; ")
        };
        handle.error = Some(ErrorDetail::new(None, reasons));
    }
    Ok(handle)
}
