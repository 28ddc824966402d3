//! Artifact writer: persist a finished operation's video atomically.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::operation::ArtifactLocator;

use super::fetch::RemoteFetcher;
use super::{finalize, temp_path};

/// Writes inline bytes or fetches remote objects into place.
///
/// Both paths go through `<dest>.part` and a rename; on failure the temp file
/// is removed, so `dest` only ever appears complete.
pub struct ArtifactWriter {
    fetcher: Arc<dyn RemoteFetcher>,
}

impl ArtifactWriter {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn write(&self, locator: &ArtifactLocator, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create output dir {}", parent.display()))?;
        }
        let temp = temp_path(dest);
        let result = self.write_temp(locator, &temp).await;
        let result = match result {
            Ok(()) => finalize(&temp, dest).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %temp.display(), "could not remove temp file: {}", e);
                }
            }
        }
        result
    }

    async fn write_temp(&self, locator: &ArtifactLocator, temp: &Path) -> Result<()> {
        match locator {
            ArtifactLocator::Inline(bytes) => {
                if bytes.is_empty() {
                    anyhow::bail!("inline video is empty");
                }
                let mut file = tokio::fs::File::create(temp)
                    .await
                    .with_context(|| format!("failed to create temp file: {}", temp.display()))?;
                file.write_all(bytes)
                    .await
                    .with_context(|| format!("write {}", temp.display()))?;
                file.sync_all().await.context("storage sync failed")?;
                Ok(())
            }
            ArtifactLocator::Remote(uri) => {
                self.fetcher.fetch(uri, temp).await?;
                let meta = tokio::fs::metadata(temp)
                    .await
                    .with_context(|| format!("fetch of {} produced no file", uri))?;
                if meta.len() == 0 {
                    anyhow::bail!("fetch of {} produced an empty file", uri);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Copies from a local "bucket" directory, or fails after a partial write.
    struct DirFetcher {
        root: PathBuf,
        fail_after_partial: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteFetcher for DirFetcher {
        async fn fetch(&self, uri: &str, dest: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(uri.to_string());
            if self.fail_after_partial {
                tokio::fs::write(dest, b"trunc").await?;
                anyhow::bail!("connection reset");
            }
            let name = uri.rsplit('/').next().unwrap();
            tokio::fs::copy(self.root.join(name), dest).await?;
            Ok(())
        }
    }

    fn writer(root: &Path, fail: bool) -> (ArtifactWriter, Arc<DirFetcher>) {
        let f = Arc::new(DirFetcher {
            root: root.to_path_buf(),
            fail_after_partial: fail,
            calls: Mutex::new(Vec::new()),
        });
        (ArtifactWriter::new(f.clone()), f)
    }

    #[tokio::test]
    async fn inline_bytes_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let (w, _) = writer(dir.path(), false);
        let dest = dir.path().join("out").join("segment_01.mp4");
        w.write(&ArtifactLocator::Inline(b"video".to_vec()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"video");
        assert!(!temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn remote_object_fetched_then_renamed() {
        let bucket = tempfile::tempdir().unwrap();
        std::fs::write(bucket.path().join("v.mp4"), b"remote-video").unwrap();
        let out = tempfile::tempdir().unwrap();
        let (w, f) = writer(bucket.path(), false);
        let dest = out.path().join("segment_02.mp4");
        w.write(&ArtifactLocator::Remote("gs://b/v.mp4".into()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"remote-video");
        assert_eq!(f.calls.lock().unwrap().as_slice(), ["gs://b/v.mp4"]);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_nothing_behind() {
        let out = tempfile::tempdir().unwrap();
        let (w, _) = writer(out.path(), true);
        let dest = out.path().join("segment_03.mp4");
        let err = w
            .write(&ArtifactLocator::Remote("gs://b/v.mp4".into()), &dest)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(!dest.exists());
        assert!(!temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn empty_inline_video_is_rejected() {
        let out = tempfile::tempdir().unwrap();
        let (w, _) = writer(out.path(), false);
        let dest = out.path().join("segment_04.mp4");
        assert!(w.write(&ArtifactLocator::Inline(Vec::new()), &dest).await.is_err());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn stale_part_file_is_overwritten() {
        let out = tempfile::tempdir().unwrap();
        let (w, _) = writer(out.path(), false);
        let dest = out.path().join("segment_05.mp4");
        std::fs::write(temp_path(&dest), b"stale partial data from a crash").unwrap();
        w.write(&ArtifactLocator::Inline(b"new".to_vec()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }
}
