//! Tests for status and stitch subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::{Path, PathBuf};

#[test]
fn cli_parse_status() {
    match parse(&["cinema", "status", "--script", "s.json"]) {
        CliCommand::Status { target, checksum } => {
            assert_eq!(target.script, PathBuf::from("s.json"));
            assert!(!checksum);
        }
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_checksum_and_dir() {
    match parse(&[
        "cinema",
        "status",
        "--script",
        "s.json",
        "--output-dir",
        "out",
        "--checksum",
    ]) {
        CliCommand::Status { target, checksum } => {
            assert_eq!(target.output_dir.as_deref(), Some(Path::new("out")));
            assert!(checksum);
        }
        _ => panic!("expected Status with --checksum"),
    }
}

#[test]
fn cli_parse_stitch() {
    match parse(&["cinema", "stitch", "--script", "s.json"]) {
        CliCommand::Stitch { out, .. } => assert!(out.is_none()),
        _ => panic!("expected Stitch"),
    }
}

#[test]
fn cli_parse_stitch_out() {
    match parse(&["cinema", "stitch", "--script", "s.json", "--out", "movie.mp4"]) {
        CliCommand::Stitch { out, .. } => {
            assert_eq!(out.as_deref(), Some(Path::new("movie.mp4")));
        }
        _ => panic!("expected Stitch with --out"),
    }
}

#[test]
fn cli_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["cinema", "add", "x"]).is_err());
}
