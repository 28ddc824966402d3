//! `cinema chain` – sequential generation with last-frame continuity.

use anyhow::Result;
use cinema_core::chain::ContinuityChain;
use cinema_core::config::CinemaConfig;
use cinema_core::driver::DriverSettings;
use cinema_core::media::{stitch_report, Ffmpeg};
use cinema_core::storage::{ArtifactWriter, GcloudFetcher};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{build_provider, cancel_on_ctrl_c, exit_code, load_specs, print_report, progress};

pub async fn run_chain(cfg: &CinemaConfig, script: &Path, stitch: bool) -> Result<i32> {
    let specs = load_specs(script)?;
    let provider = build_provider(cfg)?;
    let writer = Arc::new(ArtifactWriter::new(Arc::new(GcloudFetcher::default())));
    let media = Arc::new(Ffmpeg::default());
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    println!(
        "Generating {} segment(s) in sequence into {}",
        specs.len(),
        cfg.output_dir.display()
    );

    let (events, printer) = progress::spawn_printer();
    let chain = ContinuityChain::new(
        provider,
        writer,
        media.clone(),
        DriverSettings::from_config(cfg),
        cancel,
    )
    .with_events(events);
    let report = chain.run(&specs, &cfg.output_dir).await;
    drop(chain);
    let _ = printer.await;

    print_report(&report);
    if stitch && !report.was_cancelled() {
        match stitch_report(media.as_ref(), &report, &cfg.output_dir).await? {
            Some(movie) => println!("Stitched {}", movie.display()),
            None => println!("Not stitching: some segments have no video."),
        }
    }
    Ok(exit_code(&report))
}
