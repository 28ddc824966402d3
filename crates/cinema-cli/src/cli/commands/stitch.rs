//! `cinema stitch` – concatenate existing segments into one movie.

use anyhow::{bail, Result};
use cinema_core::config::CinemaConfig;
use cinema_core::media::{Ffmpeg, MediaTools};
use cinema_core::storage::{final_movie_path, segment_path};
use std::path::Path;

use super::load_specs;

pub async fn run_stitch(cfg: &CinemaConfig, script: &Path, out: Option<&Path>) -> Result<()> {
    let specs = load_specs(script)?;
    let inputs: Vec<_> = specs
        .iter()
        .map(|s| segment_path(&cfg.output_dir, s.index))
        .collect();
    let missing: Vec<String> = specs
        .iter()
        .zip(&inputs)
        .filter(|(_, p)| !p.is_file())
        .map(|(s, _)| s.label())
        .collect();
    if !missing.is_empty() {
        bail!("cannot stitch, missing segments: {}", missing.join(", "));
    }
    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| final_movie_path(&cfg.output_dir));
    Ffmpeg::default().stitch_videos(&inputs, &out).await?;
    println!("Stitched {} segment(s) into {}", inputs.len(), out.display());
    Ok(())
}
