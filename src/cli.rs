//! Command-line interface definitions for dedupe.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates under a photo share
//! dedupe /volume1/photo
//!
//! # Write a reviewable rm script, skipping ISO images
//! dedupe --write-rm-script --exclude-pathname='*.iso' /volume1/photo
//!
//! # Compare images by metadata first, JSON on stdout
//! dedupe --metadata-checksum-first --output json /volume1/photo
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Duplicate file finder that proposes, never performs, deletions.
///
/// Files are grouped by size, confirmed by BLAKE3 checksum, and one copy per
/// set is kept (the first in walk order). With `--write-rm-script` the
/// proposed removals are written to an executable shell script for review.
#[derive(Debug, Parser)]
#[command(name = "dedupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan for duplicates
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Write the deletion plan as an rm script
    #[arg(long)]
    pub write_rm_script: bool,

    /// Exclude paths matching this glob (repeatable, OR-combined)
    ///
    /// Matched against the absolute path; `*` also matches `/`.
    #[arg(long = "exclude-pathname", value_name = "GLOB")]
    pub exclude_pathname: Vec<String>,

    /// Compare images by metadata checksum before content
    #[arg(long)]
    pub metadata_checksum_first: bool,

    /// Group candidates by file name and size instead of size alone
    #[arg(long)]
    pub by_name: bool,

    /// Report every checksum family of an ambiguous group instead of failing
    #[arg(long)]
    pub split_ambiguous_groups: bool,

    /// Directory the rm script is written to (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub rm_script_dir: Option<PathBuf>,

    /// Ignore zero-byte files
    #[arg(long)]
    pub skip_empty: bool,

    /// Follow symbolic links during scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Number of threads for checksumming (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub io_threads: Option<u64>,

    /// Output format for results on stdout
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Configuration file (default: platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and results
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Result format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON document for scripting
    Json,
}

/// Parse a human-readable size such as `10MB` or `1.5GiB` into bytes.
///
/// # Errors
///
/// Returns a message if the number or suffix cannot be parsed.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
