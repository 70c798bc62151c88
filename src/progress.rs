//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ProgressCallback`] trait the finder reports
//! through, and the [`Progress`] struct which implements it with progress
//! bars on stderr.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::duplicates::DuplicateSet;

/// Progress callback for duplicate finding phases.
///
/// Implement this trait to receive progress updates during
/// the duplicate detection pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ("walking" or "fingerprint")
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been fingerprinted, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}

    /// Called as soon as a duplicate set is confirmed.
    fn on_duplicate_set(&self, _set: &DuplicateSet) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    fingerprint: Mutex<Option<ProgressBar>>,
    bytes_hashed: AtomicU64,
    sets_found: AtomicUsize,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dedupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert_eq!(progress.sets_found(), 0);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
        };
        Self {
            multi,
            walking: Mutex::new(None),
            fingerprint: Mutex::new(None),
            bytes_hashed: AtomicU64::new(0),
            sets_found: AtomicUsize::new(0),
            quiet,
        }
    }

    /// Number of duplicate sets reported so far.
    #[must_use]
    pub fn sets_found(&self) -> usize {
        self.sets_found.load(Ordering::SeqCst)
    }

    /// Bytes fingerprinted so far.
    #[must_use]
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed.load(Ordering::SeqCst)
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn fingerprint_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            "walking" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Walking directory");
                pb.enable_steady_tick(Duration::from_millis(100));
                *lock(&self.walking) = Some(pb);
            }
            "fingerprint" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::fingerprint_style());
                pb.set_message("Checksumming");
                *lock(&self.fingerprint) = Some(pb);
            }
            other => log::debug!("Unknown phase started: {}", other),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let display_msg = truncate_path(path, 40);
        if let Some(ref pb) = *lock(&self.fingerprint) {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        } else if let Some(ref pb) = *lock(&self.walking) {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes_hashed.fetch_add(bytes, Ordering::SeqCst);
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        match phase {
            "walking" => {
                if let Some(pb) = lock(&self.walking).take() {
                    pb.finish_with_message("Walking complete");
                }
            }
            "fingerprint" => {
                if let Some(pb) = lock(&self.fingerprint).take() {
                    pb.finish_with_message(format!(
                        "Checksumming complete ({} read)",
                        ByteSize::b(self.bytes_hashed())
                    ));
                }
            }
            _ => {}
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *lock(&self.fingerprint) {
            pb.set_message(message.to_string());
        } else if let Some(ref pb) = *lock(&self.walking) {
            pb.set_message(message.to_string());
        } else {
            log::info!("{}", message);
        }
    }

    fn on_duplicate_set(&self, set: &DuplicateSet) {
        let found = self.sets_found.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            "Duplicate set #{}: keep {} ({} removable)",
            found,
            set.keep().path.display(),
            set.removals().len()
        );
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
