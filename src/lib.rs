//! dedupe - duplicate file finder that proposes deletions for review
//!
//! Files under a root are grouped by size (or by name and size), confirmed
//! by BLAKE3 checksum of their content or, for images, of their metadata, and
//! turned into a [`plan::DeletionPlan`]: in every set the first file in walk
//! order is kept. Nothing is ever deleted; the plan is printed and can be
//! written as an executable `rm` script.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod plan;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{
    AmbiguityPolicy, DuplicateFinder, FinderConfig, FinderError, FingerprintPolicy, GroupingMode,
};
use crate::error::ExitCode;
use crate::output::{JsonOutput, ScriptOutput, TextOutput};
use crate::plan::DeletionPlan;
use crate::progress::Progress;
use crate::scanner::WalkerConfig;

/// Run one scan as described by `cli`.
///
/// Configuration file and `DEDUPE_*` environment values are loaded first and
/// CLI flags are applied over them. The report goes to stdout; progress and
/// logs go to stderr.
///
/// # Errors
///
/// Returns an error for an invalid root, a bad configuration or exclusion
/// glob, an ambiguous candidate group, a failure writing the script, or an
/// interrupted scan (`FinderError::Interrupted`, exit code 130).
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let handler = signal::install_handler()?;

    let mut exclude_patterns = config.exclude_patterns.clone();
    exclude_patterns.extend(cli.exclude_pathname.iter().cloned());

    let walker_config = WalkerConfig::default()
        .with_patterns(exclude_patterns.clone())
        .with_reserved_dir_markers(config.reserved_dir_markers.clone())
        .with_reserved_file_names(config.reserved_file_names.clone())
        .with_follow_symlinks(cli.follow_symlinks || config.follow_symlinks)
        .with_skip_empty(cli.skip_empty || config.skip_empty)
        .with_min_size(cli.min_size)
        .with_max_size(cli.max_size);

    let io_threads = cli
        .io_threads
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(config.io_threads);

    let mode = if cli.by_name {
        GroupingMode::ByNameAndSize
    } else {
        GroupingMode::BySize
    };
    let policy = if cli.metadata_checksum_first || config.metadata_checksum_first {
        FingerprintPolicy::MetadataFirst
    } else {
        FingerprintPolicy::ContentOnly
    };
    let ambiguity = if cli.split_ambiguous_groups {
        AmbiguityPolicy::Split
    } else {
        AmbiguityPolicy::Fail
    };

    let hide_progress = cli.quiet || cli.output == OutputFormat::Json;
    let progress = Arc::new(Progress::new(hide_progress));

    let finder_config = FinderConfig::default()
        .with_io_threads(io_threads)
        .with_mode(mode)
        .with_policy(policy)
        .with_ambiguity(ambiguity)
        .with_mmap_threshold(config.mmap_threshold)
        .with_walker_config(walker_config)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);

    log::debug!("Finder configuration: {:?}", finder_config);

    let finder = DuplicateFinder::new(finder_config);
    let (sets, summary) = finder.find_duplicates(&cli.root)?;
    if handler.is_shutdown_requested() {
        return Err(FinderError::Interrupted.into());
    }

    let plan = DeletionPlan::build(&summary.root, &exclude_patterns, sets);

    let script_path = if cli.write_rm_script {
        write_script(&plan, cli.rm_script_dir.or(config.rm_script_dir))?
    } else {
        None
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        OutputFormat::Text => {
            let color = !cli.no_color && stdout.is_terminal();
            TextOutput::new(&plan, &summary)
                .with_color(color)
                .write_to(&mut out)
                .context("Failed to write report")?;
            if let Some(ref path) = script_path {
                writeln!(out, "Deletion script written to {}", path.display())?;
            }
        }
        OutputFormat::Json => {
            JsonOutput::new(&plan, &summary, ExitCode::Success)
                .with_script_path(script_path.as_deref())
                .write_to(&mut out, true)
                .context("Failed to write JSON report")?;
        }
    }
    out.flush()?;

    Ok(ExitCode::Success)
}

fn write_script(plan: &DeletionPlan, dir: Option<PathBuf>) -> anyhow::Result<Option<PathBuf>> {
    if plan.is_empty() {
        log::info!("No dupes found, no deletion script written");
        return Ok(None);
    }

    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let path = ScriptOutput::new(plan)
        .write_to_dir(&dir)
        .with_context(|| format!("Failed to write deletion script in {}", dir.display()))?;
    Ok(Some(path))
}
