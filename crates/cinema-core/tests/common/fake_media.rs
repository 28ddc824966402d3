//! `MediaTools` stand-in that writes placeholder frames and records calls.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cinema_core::media::{last_frame_path, MediaTools};

#[derive(Default)]
pub struct FakeMedia {
    pub frames: Mutex<Vec<PathBuf>>,
    pub stitched: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
}

#[async_trait]
impl MediaTools for FakeMedia {
    async fn extract_last_frame(&self, video: &Path) -> Result<PathBuf> {
        if !video.exists() {
            bail!("no such video {}", video.display());
        }
        let frame = last_frame_path(video);
        std::fs::write(&frame, b"jpeg")?;
        self.frames.lock().unwrap().push(frame.clone());
        Ok(frame)
    }

    async fn stitch_videos(&self, inputs: &[PathBuf], out: &Path) -> Result<()> {
        if inputs.is_empty() {
            bail!("no videos to stitch");
        }
        let mut joined = Vec::new();
        for p in inputs {
            joined.extend(std::fs::read(p)?);
        }
        std::fs::write(out, joined)?;
        self.stitched
            .lock()
            .unwrap()
            .push((inputs.to_vec(), out.to_path_buf()));
        Ok(())
    }
}
