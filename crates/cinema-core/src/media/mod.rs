//! ffmpeg shims: last-frame extraction for continuity and concat stitching.
//!
//! Behind the `MediaTools` trait so the chain and the CLI can be driven
//! without ffmpeg installed.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::outcome::BatchReport;
use crate::storage::{final_movie_path, temp_path};

/// Bytes of ffmpeg stderr kept in error messages.
const STDERR_TAIL: usize = 1024;

#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Write the final frame of `video` next to it as `<stem>_last.jpg`.
    async fn extract_last_frame(&self, video: &Path) -> Result<PathBuf>;

    /// Concatenate `inputs` in order into `out` without re-encoding.
    async fn stitch_videos(&self, inputs: &[PathBuf], out: &Path) -> Result<()>;
}

/// `<dir>/<stem>_last.jpg` for a video path.
pub fn last_frame_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    video.with_file_name(format!("{}_last.jpg", stem))
}

/// Body of an ffmpeg concat-demuxer list, one `file '<path>'` line per input.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    let mut out = String::new();
    for p in inputs {
        let escaped = p.to_string_lossy().replace('\'', r"'\''");
        out.push_str(&format!("file '{}'\n", escaped));
    }
    out
}

/// The `ffmpeg` binary on PATH (or an explicit one).
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl Ffmpeg {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, what: &str, args: &mut Command) -> Result<()> {
        let output = args
            .output()
            .await
            .with_context(|| format!("failed to run {} for {}", self.binary.display(), what))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let start = stderr.len().saturating_sub(STDERR_TAIL);
            let tail = stderr.get(start..).unwrap_or(&stderr);
            bail!("ffmpeg {} failed ({}): {}", what, output.status, tail.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl MediaTools for Ffmpeg {
    async fn extract_last_frame(&self, video: &Path) -> Result<PathBuf> {
        let frame = last_frame_path(video);
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-y", "-sseof", "-0.1", "-i"])
            .arg(video)
            .args(["-vframes", "1", "-q:v", "2"])
            .arg(&frame);
        self.run("last-frame extraction", &mut cmd).await?;
        if !frame.exists() {
            bail!("ffmpeg wrote no frame for {}", video.display());
        }
        tracing::debug!(video = %video.display(), frame = %frame.display(), "extracted last frame");
        Ok(frame)
    }

    async fn stitch_videos(&self, inputs: &[PathBuf], out: &Path) -> Result<()> {
        if inputs.is_empty() {
            bail!("no videos to stitch");
        }
        let mut absolute = Vec::with_capacity(inputs.len());
        for p in inputs {
            let abs = tokio::fs::canonicalize(p)
                .await
                .with_context(|| format!("missing stitch input {}", p.display()))?;
            absolute.push(abs);
        }

        let mut list = tempfile::Builder::new()
            .prefix("cinema-concat-")
            .suffix(".txt")
            .tempfile()
            .context("create concat list")?;
        list.write_all(concat_list(&absolute).as_bytes())
            .and_then(|_| list.flush())
            .context("write concat list")?;

        let part = temp_path(out);
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(list.path())
            .args(["-c", "copy", "-f", "mp4"])
            .arg(&part);
        if let Err(e) = self.run("concat", &mut cmd).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        crate::storage::finalize(&part, out).await?;
        tracing::info!(count = inputs.len(), out = %out.display(), "stitched segments");
        Ok(())
    }
}

/// Stitch a finished run into `<output_dir>/final_movie.mp4`.
///
/// Returns `Ok(None)` without touching ffmpeg when any segment lacks an
/// artifact; a movie with holes is never produced.
pub async fn stitch_report(
    tools: &dyn MediaTools,
    report: &BatchReport,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let Some(inputs) = report.artifact_paths() else {
        let missing: Vec<usize> = report
            .outcomes
            .iter()
            .filter(|o| o.artifact().is_none())
            .map(|o| o.segment_index)
            .collect();
        tracing::warn!(?missing, "not stitching: segments without artifacts");
        return Ok(None);
    };
    let out = final_movie_path(output_dir);
    tools.stitch_videos(&inputs, &out).await?;
    Ok(Some(out))
}
