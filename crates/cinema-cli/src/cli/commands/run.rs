//! `cinema run` – generate every missing segment concurrently.

use anyhow::Result;
use cinema_core::config::CinemaConfig;
use cinema_core::driver::DriverSettings;
use cinema_core::media::{stitch_report, Ffmpeg};
use cinema_core::scheduler::{BatchOrchestrator, ConcurrencyLimiter};
use cinema_core::storage::{segment_path, ArtifactWriter, GcloudFetcher};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{build_provider, cancel_on_ctrl_c, exit_code, load_specs, print_report, progress};

pub async fn run_batch(cfg: &CinemaConfig, script: &Path, stitch: bool) -> Result<i32> {
    let specs = load_specs(script)?;
    let provider = build_provider(cfg)?;
    let writer = Arc::new(ArtifactWriter::new(Arc::new(GcloudFetcher::default())));
    let limiter = Arc::new(ConcurrencyLimiter::new(cfg.max_concurrent_jobs));
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    println!(
        "Generating {} segment(s), up to {} at a time, into {}",
        specs.len(),
        limiter.capacity(),
        cfg.output_dir.display()
    );

    let (events, printer) = progress::spawn_printer();
    let orchestrator = BatchOrchestrator::new(
        provider,
        writer,
        limiter,
        DriverSettings::from_config(cfg),
        cancel,
    )
    .with_events(events);
    let report = orchestrator
        .run(&specs, |i| segment_path(&cfg.output_dir, i))
        .await;
    drop(orchestrator);
    let _ = printer.await;

    print_report(&report);
    if stitch && !report.was_cancelled() {
        match stitch_report(&Ffmpeg::default(), &report, &cfg.output_dir).await? {
            Some(movie) => println!("Stitched {}", movie.display()),
            None => println!("Not stitching: some segments have no video."),
        }
    }
    Ok(exit_code(&report))
}
