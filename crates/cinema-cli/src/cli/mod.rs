//! CLI for cinema batch video generation.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cinema_core::config::{self, CinemaConfig};
use std::path::PathBuf;

use commands::{run_batch, run_chain, run_status, run_stitch};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cinema")]
#[command(about = "Generate a movie from a script, one video segment per job", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/cinema/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Script and output location shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Script JSON with global_settings and segments.
    #[arg(long, value_name = "FILE")]
    pub script: PathBuf,

    /// Where segment_NN.mp4 files live (overrides config and OUTPUT_DIR).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Driver tuning flags for generating commands.
#[derive(Debug, Clone, Default, Args)]
pub struct Tuning {
    /// Seconds between polls of a running operation.
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Submit attempts per segment, including the first.
    #[arg(long, value_name = "K")]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Generate all missing segments concurrently.
    Run {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        tuning: Tuning,
        /// Segments generating at once (default from config, 4).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Concatenate into final_movie.mp4 when every segment exists.
        #[arg(long)]
        stitch: bool,
    },

    /// Generate segments one by one, each continuing from the previous last frame.
    Chain {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        tuning: Tuning,
        #[arg(long)]
        stitch: bool,
    },

    /// Show which segment artifacts exist.
    Status {
        #[command(flatten)]
        target: Target,
        /// Also print SHA-256 of each artifact.
        #[arg(long)]
        checksum: bool,
    },

    /// Concatenate existing segments into one movie.
    Stitch {
        #[command(flatten)]
        target: Target,
        /// Output file (default <output_dir>/final_movie.mp4).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

/// Apply command-line overrides on top of file and environment config.
pub(crate) fn apply_overrides(
    cfg: &mut CinemaConfig,
    target: &Target,
    tuning: &Tuning,
    jobs: Option<usize>,
) {
    if let Some(dir) = &target.output_dir {
        cfg.output_dir = dir.clone();
    }
    if let Some(secs) = tuning.poll_interval {
        cfg.poll_interval_secs = secs;
    }
    if let Some(k) = tuning.max_attempts {
        let mut retry = cfg.retry_or_default();
        retry.max_attempts = k;
        cfg.retry = Some(retry);
    }
    if let Some(n) = jobs {
        cfg.max_concurrent_jobs = n;
    }
}

impl CliCommand {
    /// Parse args, load config, dispatch. Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let mut cfg = config::load_effective(cli.config.as_deref())?;

        match cli.command {
            CliCommand::Run {
                target,
                tuning,
                jobs,
                stitch,
            } => {
                apply_overrides(&mut cfg, &target, &tuning, jobs);
                tracing::debug!("effective config: {:?}", redacted(&cfg));
                run_batch(&cfg, &target.script, stitch).await
            }
            CliCommand::Chain {
                target,
                tuning,
                stitch,
            } => {
                apply_overrides(&mut cfg, &target, &tuning, None);
                tracing::debug!("effective config: {:?}", redacted(&cfg));
                run_chain(&cfg, &target.script, stitch).await
            }
            CliCommand::Status { target, checksum } => {
                apply_overrides(&mut cfg, &target, &Tuning::default(), None);
                run_status(&cfg, &target.script, checksum).await?;
                Ok(0)
            }
            CliCommand::Stitch { target, out } => {
                apply_overrides(&mut cfg, &target, &Tuning::default(), None);
                run_stitch(&cfg, &target.script, out.as_deref()).await?;
                Ok(0)
            }
        }
    }
}

/// Config with the access token masked, for debug logs.
fn redacted(cfg: &CinemaConfig) -> CinemaConfig {
    let mut c = cfg.clone();
    if c.provider.access_token.is_some() {
        c.provider.access_token = Some("***".to_string());
    }
    c
}

#[cfg(test)]
mod tests;
