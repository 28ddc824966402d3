//! Artifact layout on disk and atomic finalize.
//!
//! Every segment has one deterministic path (`segment_NN.mp4`). Artifacts are
//! written to `<path>.part` and renamed into place, so the existence of the
//! final path is the resumability marker: it exists complete or not at all.

mod artifact;
mod fetch;

use std::path::{Path, PathBuf};

pub use artifact::ArtifactWriter;
pub use fetch::{GcloudFetcher, RemoteFetcher};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// File name of the stitched movie inside the output directory.
pub const FINAL_MOVIE: &str = "final_movie.mp4";

/// Path for the temp file: appends `.part` to the final path (e.g. `segment_01.mp4` → `segment_01.mp4.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Deterministic artifact path for a 1-based segment index.
pub fn segment_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("segment_{:02}.mp4", index))
}

pub fn final_movie_path(output_dir: &Path) -> PathBuf {
    output_dir.join(FINAL_MOVIE)
}

/// What is on disk for one artifact path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Final file exists (size in bytes).
    Complete(u64),
    /// Only a leftover `.part` from an interrupted write.
    Partial,
    Missing,
}

/// Inspect an artifact path without touching it.
pub fn inspect(path: &Path) -> ArtifactState {
    match std::fs::metadata(path) {
        Ok(m) if m.is_file() => ArtifactState::Complete(m.len()),
        _ if temp_path(path).exists() => ArtifactState::Partial,
        _ => ArtifactState::Missing,
    }
}

/// Rename a fully written temp file onto its final path.
pub(crate) async fn finalize(temp: &Path, final_path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;
    tokio::fs::rename(temp, final_path).await.with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp.display(),
            final_path.display()
        )
    })
}
