//! Vertex AI video generation provider (Veo `predictLongRunning`).
//!
//! Submit posts to `<model>:predictLongRunning`; poll posts the operation
//! name to `<model>:fetchPredictOperation`. HTTP runs on libcurl inside
//! `spawn_blocking`, like the rest of the blocking I/O in this crate.

mod http;
mod token;
mod wire;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::operation::OperationHandle;
use crate::provider::{GenerationProvider, ProviderError, SubmitRequest};

pub use token::TokenSource;

use self::http::HttpResponse;

/// Longest we let a single submit/poll HTTP exchange run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Keep error bodies short enough for log lines.
const MAX_ERROR_BODY: usize = 2048;

/// Connection settings for one Vertex project/location.
#[derive(Debug, Clone)]
pub struct VertexSettings {
    pub project_id: String,
    pub location: String,
    /// Base URL override (tests, private endpoints). Defaults to the regional host.
    pub endpoint: Option<String>,
}

impl VertexSettings {
    /// Build from config; project and location are required.
    pub fn from_config(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let project_id = cfg
            .project_id
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("provider project_id is not set (GOOGLE_CLOUD_PROJECT)"))?;
        let location = cfg
            .location
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("provider location is not set (GOOGLE_CLOUD_LOCATION)"))?;
        Ok(Self {
            project_id,
            location,
            endpoint: cfg.endpoint.clone().filter(|s| !s.is_empty()),
        })
    }

    fn base_url(&self) -> String {
        match &self.endpoint {
            Some(e) => e.trim_end_matches('/').to_string(),
            None if self.location == "global" => "https://aiplatform.googleapis.com".to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        }
    }
}

/// `GenerationProvider` backed by the Vertex AI REST API.
pub struct VertexProvider {
    settings: VertexSettings,
    tokens: Arc<TokenSource>,
}

impl VertexProvider {
    pub fn new(settings: VertexSettings, tokens: TokenSource) -> Self {
        Self {
            settings,
            tokens: Arc::new(tokens),
        }
    }

    /// Build from config: a configured access token wins, else gcloud.
    pub fn from_config(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let settings = VertexSettings::from_config(cfg)?;
        let tokens = match cfg.access_token.clone().filter(|t| !t.is_empty()) {
            Some(t) => TokenSource::fixed(t),
            None => TokenSource::gcloud(),
        };
        Ok(Self::new(settings, tokens))
    }

    fn predict_url(&self, model: &str) -> String {
        let model = model.trim_start_matches("vertexai/");
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predictLongRunning",
            self.settings.base_url(),
            self.settings.project_id,
            self.settings.location,
            model
        )
    }

    fn fetch_url(&self, operation_name: &str) -> Result<String, ProviderError> {
        let (model_path, _) = operation_name.split_once("/operations/").ok_or_else(|| {
            ProviderError::Decode(format!("unexpected operation name: {}", operation_name))
        })?;
        Ok(format!(
            "{}/v1/{}:fetchPredictOperation",
            self.settings.base_url(),
            model_path
        ))
    }

    async fn post(&self, url: String, body: Vec<u8>) -> Result<HttpResponse, ProviderError> {
        let tokens = Arc::clone(&self.tokens);
        let resp = tokio::task::spawn_blocking(move || {
            let token = tokens.token()?;
            let resp = http::post_json(&url, &token, &body, REQUEST_TIMEOUT)?;
            if resp.status == 401 {
                tokens.invalidate();
                let token = tokens.token()?;
                return http::post_json(&url, &token, &body, REQUEST_TIMEOUT);
            }
            Ok(resp)
        })
        .await
        .map_err(|e| ProviderError::Transport(format!("request task join: {}", e)))??;

        if !resp.is_success() {
            let mut body = resp.body_text();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ProviderError::Http {
                status: resp.status,
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl GenerationProvider for VertexProvider {
    async fn submit(&self, request: &SubmitRequest) -> Result<OperationHandle, ProviderError> {
        let start_frame = match &request.start_frame {
            Some(path) => Some(tokio::fs::read(path).await.map_err(|e| {
                ProviderError::Request(format!("read start frame {}: {}", path.display(), e))
            })?),
            None => None,
        };
        let body = wire::predict_body(request, start_frame.as_deref())?;
        let url = self.predict_url(&request.params.model);
        tracing::debug!(segment = request.segment_index, url = %url, "submitting generation");
        let resp = self.post(url, body).await?;
        wire::parse_started(&resp.body)
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationHandle, ProviderError> {
        let url = self.fetch_url(&handle.remote_id)?;
        let body = serde_json::to_vec(&wire::FetchRequest {
            operation_name: &handle.remote_id,
        })
        .map_err(|e| ProviderError::Request(e.to_string()))?;
        let resp = self.post(url, body).await?;
        wire::parse_polled(handle, &resp.body)
    }
}
