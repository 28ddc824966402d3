//! Bearer tokens for Vertex AI.
//!
//! Either a fixed token (e.g. `CINEMA_ACCESS_TOKEN`) or one minted with
//! `gcloud auth print-access-token` and re-minted before it expires, since a
//! batch can outlive a single token.

use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::provider::ProviderError;

/// gcloud tokens live for an hour; refresh well before that.
const GCLOUD_TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

pub enum TokenSource {
    Static(String),
    Gcloud {
        binary: String,
        cached: Mutex<Option<(String, Instant)>>,
    },
}

impl TokenSource {
    pub fn fixed(token: impl Into<String>) -> Self {
        TokenSource::Static(token.into())
    }

    pub fn gcloud() -> Self {
        TokenSource::Gcloud {
            binary: "gcloud".to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Current token. Blocking (may run gcloud); call from `spawn_blocking`.
    pub fn token(&self) -> Result<String, ProviderError> {
        match self {
            TokenSource::Static(t) => Ok(t.clone()),
            TokenSource::Gcloud { binary, cached } => {
                let mut guard = cached
                    .lock()
                    .map_err(|_| ProviderError::Auth("token cache poisoned".into()))?;
                if let Some((token, minted)) = guard.as_ref() {
                    if minted.elapsed() < GCLOUD_TOKEN_TTL {
                        return Ok(token.clone());
                    }
                }
                let token = mint_with_gcloud(binary)?;
                tracing::debug!("minted new access token with {}", binary);
                *guard = Some((token.clone(), Instant::now()));
                Ok(token)
            }
        }
    }

    /// Drop a cached token so the next call mints a new one (after HTTP 401).
    pub fn invalidate(&self) {
        if let TokenSource::Gcloud { cached, .. } = self {
            if let Ok(mut guard) = cached.lock() {
                *guard = None;
            }
        }
    }
}

fn mint_with_gcloud(binary: &str) -> Result<String, ProviderError> {
    let output = Command::new(binary)
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| ProviderError::Auth(format!("failed to run {}: {}", binary, e)))?;
    if !output.status.success() {
        return Err(ProviderError::Auth(format!(
            "{} auth print-access-token failed: {}",
            binary,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ProviderError::Auth("gcloud returned an empty token".into()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_is_returned_as_is() {
        let src = TokenSource::fixed("abc");
        assert_eq!(src.token().unwrap(), "abc");
        src.invalidate();
        assert_eq!(src.token().unwrap(), "abc");
    }

    #[test]
    fn missing_gcloud_binary_is_auth_error() {
        let src = TokenSource::Gcloud {
            binary: "definitely-not-a-real-gcloud-binary".into(),
            cached: Mutex::new(None),
        };
        assert!(matches!(src.token(), Err(ProviderError::Auth(_))));
    }
}
