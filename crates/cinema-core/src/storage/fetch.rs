//! Copy a remote storage object to a local path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Collaborator that materializes a remote object (e.g. `gs://...`) locally.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Copy `uri` to `dest`. `dest` may be left partially written on error;
    /// the caller owns cleanup.
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<()>;
}

/// Fetches with `gcloud storage cp`.
#[derive(Debug, Clone)]
pub struct GcloudFetcher {
    binary: String,
}

impl Default for GcloudFetcher {
    fn default() -> Self {
        Self {
            binary: "gcloud".to_string(),
        }
    }
}

impl GcloudFetcher {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl RemoteFetcher for GcloudFetcher {
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<()> {
        let output = Command::new(&self.binary)
            .args(["storage", "cp", uri])
            .arg(dest)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.binary))?;
        if !output.status.success() {
            anyhow::bail!(
                "{} storage cp {} failed: {}",
                self.binary,
                uri,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        tracing::debug!(uri, dest = %dest.display(), "fetched remote object");
        Ok(())
    }
}
