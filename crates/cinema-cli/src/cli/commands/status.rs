//! `cinema status` – show which segment artifacts exist.

use anyhow::Result;
use cinema_core::checksum::sha256_path_async;
use cinema_core::config::CinemaConfig;
use cinema_core::storage::{final_movie_path, inspect, segment_path, ArtifactState};
use std::path::Path;

use super::load_specs;

pub async fn run_status(cfg: &CinemaConfig, script: &Path, checksum: bool) -> Result<()> {
    let specs = load_specs(script)?;
    println!("{:<8} {:<8} {:>12} {}", "SEGMENT", "STATE", "SIZE", "PATH");
    let mut present = 0usize;
    for spec in &specs {
        let path = segment_path(&cfg.output_dir, spec.index);
        let (state, size) = match inspect(&path) {
            ArtifactState::Complete(n) => {
                present += 1;
                ("present", n.to_string())
            }
            ArtifactState::Partial => ("partial", "-".to_string()),
            ArtifactState::Missing => ("missing", "-".to_string()),
        };
        println!("{:<8} {:<8} {:>12} {}", spec.label(), state, size, path.display());
        if checksum && state == "present" {
            match sha256_path_async(&path).await {
                Ok(digest) => println!("         sha256 {}", digest),
                Err(e) => println!("         sha256 unavailable: {:#}", e),
            }
        }
    }
    println!("{}/{} segment(s) present", present, specs.len());
    let movie = final_movie_path(&cfg.output_dir);
    if movie.exists() {
        println!("final movie: {}", movie.display());
    }
    Ok(())
}
