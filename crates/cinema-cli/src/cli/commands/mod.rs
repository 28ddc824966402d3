//! CLI command handlers, one file per command.

mod chain;
mod progress;
mod run;
mod status;
mod stitch;

pub use chain::run_chain;
pub use run::run_batch;
pub use status::run_status;
pub use stitch::run_stitch;

use anyhow::{Context, Result};
use cinema_core::config::CinemaConfig;
use cinema_core::outcome::{BatchReport, JobStatus};
use cinema_core::provider::vertex::VertexProvider;
use cinema_core::provider::GenerationProvider;
use cinema_core::script::{load_script, SegmentSpec};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Exit code for a run stopped by Ctrl-C (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

pub(crate) fn load_specs(script: &Path) -> Result<Vec<SegmentSpec>> {
    let script = load_script(script)?;
    let specs = script.segment_specs().context("invalid script")?;
    tracing::info!(segments = specs.len(), "script loaded");
    Ok(specs)
}

pub(crate) fn build_provider(cfg: &CinemaConfig) -> Result<Arc<dyn GenerationProvider>> {
    let provider = VertexProvider::from_config(&cfg.provider)?;
    Ok(Arc::new(provider))
}

/// Cancel `token` on the first Ctrl-C; exit with `EXIT_CANCELLED` on the second.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = || async { tokio::signal::ctrl_c().await.is_ok() };
        if watch_interrupts(ctrl_c, token).await {
            std::process::exit(EXIT_CANCELLED);
        }
    });
}

/// Consume interrupts from `next_interrupt` (false = source gone).
/// The first cancels the run; returns true when a second one arrives.
pub(crate) async fn watch_interrupts<F, Fut>(
    mut next_interrupt: F,
    token: CancellationToken,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !next_interrupt().await {
        return false;
    }
    eprintln!("\ninterrupt received, cancelling running jobs (Ctrl-C again to quit now)...");
    tracing::warn!("interrupt received, cancelling run");
    token.cancel();

    if !next_interrupt().await {
        return false;
    }
    eprintln!("\nsecond interrupt, exiting without waiting for jobs");
    tracing::warn!("second interrupt, exiting immediately");
    true
}

/// 130 if anything was cancelled, 1 if anything failed, else 0.
pub(crate) fn exit_code(report: &BatchReport) -> i32 {
    if report.was_cancelled() {
        EXIT_CANCELLED
    } else if report.has_failures() {
        1
    } else {
        0
    }
}

/// Final per-segment accounting.
pub(crate) fn print_report(report: &BatchReport) {
    println!();
    for o in &report.outcomes {
        let label = cinema_core::script::segment_label(o.segment_index);
        match &o.status {
            JobStatus::Succeeded(p) => println!("{:<8} done     {}", label, p.display()),
            JobStatus::Skipped(p) => println!("{:<8} skipped  {}", label, p.display()),
            JobStatus::Failed(r) => println!("{:<8} FAILED   {}", label, r),
            JobStatus::Cancelled => println!("{:<8} cancelled", label),
        }
    }
    let s = report.summary();
    println!(
        "{} generated, {} skipped, {} failed, {} cancelled",
        s.succeeded, s.skipped, s.failed, s.cancelled
    );
    if report.was_cancelled() {
        println!("Run cancelled; rerun the same command to resume.");
    }
}
