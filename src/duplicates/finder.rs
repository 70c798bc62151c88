//! Duplicate finder pipeline.
//!
//! # Overview
//!
//! The finder runs detection in strictly ordered phases:
//!
//! 1. **Walk** - collect every file under the root
//! 2. **Phase 1** - group by size (or name and size), dropping singletons
//! 3. **Phase 2** - fingerprint every candidate on a bounded thread pool
//! 4. **Phase 3** - refine each candidate group into confirmed sets
//!
//! Phase 2 runs in parallel; everything else is sequential. Results are
//! ordered by scan index before any file is chosen as the one to keep, so
//! the output does not depend on thread scheduling.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let (sets, summary) = finder.find_duplicates(Path::new("/volume1/photo")).unwrap();
//!
//! for set in &sets {
//!     println!("keep {}", set.keep().path.display());
//! }
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::fingerprint::{Fingerprint, FingerprintOutcome, FingerprintPolicy, Fingerprinter};
use super::groups::{
    group_by_name_and_size, group_by_size, CandidateGroup, DuplicateSet, GroupKey,
};
use crate::progress::ProgressCallback;
use crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD;
use crate::scanner::{
    validate_root, FileEntry, HashError, Hasher, MetadataExtractor, ScanError, Walker,
    WalkerConfig,
};

/// How files are grouped before fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingMode {
    /// Group by exact size.
    #[default]
    BySize,
    /// Group by NFC-normalized base name and exact size. Always hashes
    /// content and reports every checksum family.
    ByNameAndSize,
}

/// What to do when one candidate group splits into several families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Abort the run with [`FinderError::AmbiguousGroup`].
    #[default]
    Fail,
    /// Report every family as its own duplicate set.
    Split,
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel fingerprinting.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Grouping key for candidates.
    pub mode: GroupingMode,
    /// Fingerprint policy in size mode.
    pub policy: FingerprintPolicy,
    /// Behavior for groups with several checksum families in size mode.
    pub ambiguity: AmbiguityPolicy,
    /// Files at least this large are memory-mapped for hashing.
    pub mmap_threshold: u64,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Replacement metadata extractor.
    pub extractor: Option<Arc<dyn MetadataExtractor>>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("mode", &self.mode)
            .field("policy", &self.policy)
            .field("ambiguity", &self.ambiguity)
            .field("mmap_threshold", &self.mmap_threshold)
            .field("walker_config", &self.walker_config)
            .field("extractor", &self.extractor)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            mode: GroupingMode::default(),
            policy: FingerprintPolicy::default(),
            ambiguity: AmbiguityPolicy::default(),
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            walker_config: WalkerConfig::default(),
            extractor: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the I/O thread count (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the grouping mode.
    #[must_use]
    pub fn with_mode(mut self, mode: GroupingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the fingerprint policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FingerprintPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the ambiguity policy.
    #[must_use]
    pub fn with_ambiguity(mut self, ambiguity: AmbiguityPolicy) -> Self {
        self.ambiguity = ambiguity;
        self
    }

    /// Set the memory-map threshold.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Replace the metadata extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Name mode always fingerprints by content.
    fn effective_policy(&self) -> FingerprintPolicy {
        match self.mode {
            GroupingMode::BySize => self.policy,
            GroupingMode::ByNameAndSize => FingerprintPolicy::ContentOnly,
        }
    }

    /// Name mode always reports every family.
    fn effective_ambiguity(&self) -> AmbiguityPolicy {
        match self.mode {
            GroupingMode::BySize => self.ambiguity,
            GroupingMode::ByNameAndSize => AmbiguityPolicy::Split,
        }
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Absolute scan root
    pub root: PathBuf,
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Files eliminated by grouping (unique key)
    pub eliminated_by_size: usize,
    /// Number of candidate groups
    pub candidate_groups: usize,
    /// Files fingerprinted
    pub fingerprinted_files: usize,
    /// Files compared by metadata digest
    pub metadata_fingerprints: usize,
    /// Files compared by content digest
    pub content_fingerprints: usize,
    /// Groups re-fingerprinted by content because metadata was incomplete
    pub domain_fallback_groups: usize,
    /// Files skipped because they could not be read
    pub unreadable_files: usize,
    /// Number of confirmed duplicate sets
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding kept files)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Number of walk errors (unreadable directories or files)
    pub scan_errors: usize,
    /// Duration of the entire scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The root is missing, not a directory, or unreadable.
    #[error("Invalid root directory: {0}")]
    InvalidRoot(#[source] ScanError),

    /// The walker configuration is invalid (e.g. a malformed glob).
    #[error("Invalid configuration: {0}")]
    Config(#[source] ScanError),

    /// A candidate group split into several checksum families.
    #[error(
        "Ambiguous group: files with {key} fall into {families} distinct checksum families ({})",
        format_paths(.paths)
    )]
    AmbiguousGroup {
        /// Key of the offending candidate group
        key: GroupKey,
        /// Number of non-singleton families
        families: usize,
        /// Relative paths of the group's members
        paths: Vec<PathBuf>,
    },

    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The fingerprint thread pool could not be created.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Refine one candidate group into confirmed duplicate sets.
///
/// `outcomes` holds one fingerprint outcome per member, in member order.
/// Unreadable members are skipped with a warning; the rest are bucketed by
/// fingerprint and singleton buckets are dropped.
///
/// # Errors
///
/// Returns [`FinderError::AmbiguousGroup`] if more than one bucket holds two
/// or more files and `ambiguity` is [`AmbiguityPolicy::Fail`].
pub fn refine(
    group: CandidateGroup,
    outcomes: Vec<FingerprintOutcome>,
    ambiguity: AmbiguityPolicy,
) -> Result<Vec<DuplicateSet>, FinderError> {
    let CandidateGroup { key, files } = group;
    debug_assert_eq!(files.len(), outcomes.len());

    let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();
    let mut buckets: Vec<(Fingerprint, Vec<FileEntry>)> = Vec::new();

    for (file, outcome) in files.into_iter().zip(outcomes) {
        match outcome {
            FingerprintOutcome::Unreadable(e) => {
                log::warn!("Skipping unreadable file {}: {}", file.path.display(), e);
            }
            readable => {
                let Some(fingerprint) = readable.fingerprint() else {
                    continue;
                };
                match index.get(&fingerprint) {
                    Some(&slot) => buckets[slot].1.push(file),
                    None => {
                        index.insert(fingerprint, buckets.len());
                        buckets.push((fingerprint, vec![file]));
                    }
                }
            }
        }
    }

    let families: Vec<_> = buckets
        .into_iter()
        .filter(|(_, files)| files.len() >= 2)
        .collect();

    if families.len() > 1 && ambiguity == AmbiguityPolicy::Fail {
        return Err(FinderError::AmbiguousGroup {
            key,
            families: families.len(),
            paths,
        });
    }

    let mut sets: Vec<DuplicateSet> = families
        .into_iter()
        .map(|(fingerprint, files)| DuplicateSet::new(key.clone(), fingerprint, files))
        .collect();
    sets.sort_by_key(|set| set.keep().scan_index);

    for set in &sets {
        log::debug!(
            "Duplicate set {} ({}): {} files, {} bytes each",
            set.fingerprint.hex(),
            set.domain(),
            set.len(),
            set.size()
        );
    }

    Ok(sets)
}

/// Duplicate finder that orchestrates the detection pipeline.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    fingerprinter: Fingerprinter,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new().with_mmap_threshold(config.mmap_threshold);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(flag.clone());
        }
        let mut fingerprinter = Fingerprinter::new(hasher);
        if let Some(ref extractor) = config.extractor {
            fingerprinter = fingerprinter.with_extractor(extractor.clone());
        }
        Self {
            config,
            fingerprinter,
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find all duplicate sets under `path`.
    ///
    /// Returns the confirmed sets, ordered by the scan index of their kept
    /// file, along with summary statistics.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The root does not exist or is not a directory
    /// - An exclusion glob is invalid
    /// - A candidate group is ambiguous under [`AmbiguityPolicy::Fail`]
    /// - The scan is interrupted by shutdown signal
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateSet>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let root = validate_root(path).map_err(FinderError::InvalidRoot)?;
        let mut summary = ScanSummary {
            root: root.clone(),
            ..Default::default()
        };

        let mut walker_config = self.config.walker_config.clone();
        walker_config.capture_names = self.config.mode == GroupingMode::ByNameAndSize;
        let mut walker = Walker::new(&root, walker_config).map_err(FinderError::Config)?;
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        log::info!("Starting duplicate scan of {}", root.display());

        // Walk directory and collect files
        let files = self.walk(&walker, &mut summary);
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        // Phase 1: group
        let (groups, grouping) = match self.config.mode {
            GroupingMode::BySize => group_by_size(files),
            GroupingMode::ByNameAndSize => group_by_name_and_size(files),
        };
        summary.total_files = grouping.total_files;
        summary.total_size = grouping.total_size;
        summary.eliminated_by_size = grouping.eliminated_unique;
        summary.candidate_groups = grouping.candidate_groups;

        log::info!(
            "Found {} files ({} total)",
            summary.total_files,
            summary.total_size_display()
        );

        if groups.is_empty() {
            log::info!("No potential duplicates found after grouping, scan complete");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_message(&format!("{} candidate groups pending", groups.len()));
        }

        // Phase 2: fingerprint
        let outcomes = self.fingerprint_groups(&groups)?;
        if self.config.is_shutdown_requested() {
            log::info!("Phase 2: Interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }

        // Phase 3: refine
        let policy = self.config.effective_policy();
        let ambiguity = self.config.effective_ambiguity();
        let mut outcomes = outcomes.into_iter();
        let mut sets = Vec::new();

        for group in groups {
            let mut group_outcomes: Vec<_> = outcomes.by_ref().take(group.len()).collect();

            if policy == FingerprintPolicy::MetadataFirst
                && self
                    .fingerprinter
                    .unify_domain(&group.files, &mut group_outcomes)
            {
                summary.domain_fallback_groups += 1;
                log::debug!(
                    "Group with {} compared by content: metadata missing for some files",
                    group.key
                );
            }

            for outcome in &group_outcomes {
                match outcome {
                    FingerprintOutcome::MetadataHash(_) => summary.metadata_fingerprints += 1,
                    FingerprintOutcome::ContentHash(_) => summary.content_fingerprints += 1,
                    FingerprintOutcome::Unreadable(_) => summary.unreadable_files += 1,
                }
            }
            summary.fingerprinted_files += group_outcomes.len();

            for set in refine(group, group_outcomes, ambiguity)? {
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_duplicate_set(&set);
                }
                sets.push(set);
            }
        }

        // Content re-hashing in this phase also stops on shutdown
        if self.config.is_shutdown_requested() {
            log::info!("Phase 3: Interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }

        sets.sort_by_key(|set| set.keep().scan_index);

        summary.duplicate_groups = sets.len();
        summary.duplicate_files = sets.iter().map(|s| s.removals().len()).sum();
        summary.reclaimable_space = sets.iter().map(DuplicateSet::wasted_space).sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Phase 3 complete: {} sets, {} duplicates, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((sets, summary))
    }

    fn walk(&self, walker: &Walker, summary: &mut ScanSummary) -> Vec<FileEntry> {
        let callback = self.config.progress_callback.as_ref();
        if let Some(callback) = callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", walker.root().display()));
        }

        let mut files = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    if let Some(callback) = callback {
                        callback.on_progress(files.len() + 1, &file.path.to_string_lossy());
                    }
                    files.push(file);
                }
                Err(_) => summary.scan_errors += 1,
            }
        }

        if let Some(callback) = callback {
            callback.on_phase_end("walking");
        }
        files
    }

    /// Fingerprint every member of every group, in group then member order.
    fn fingerprint_groups(
        &self,
        groups: &[CandidateGroup],
    ) -> Result<Vec<FingerprintOutcome>, FinderError> {
        let policy = self.config.effective_policy();
        let work: Vec<&FileEntry> = groups.iter().flat_map(|g| g.files.iter()).collect();
        let callback = self.config.progress_callback.as_ref();

        log::info!(
            "Phase 2: Computing fingerprints for {} files in {} groups",
            work.len(),
            groups.len()
        );
        if let Some(callback) = callback {
            callback.on_phase_start("fingerprint", work.len());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads.max(1))
            .build()?;
        let completed = AtomicUsize::new(0);

        let outcomes: Vec<FingerprintOutcome> = pool.install(|| {
            work.par_iter()
                .map(|file| {
                    if self.config.is_shutdown_requested() {
                        return FingerprintOutcome::Unreadable(HashError::Interrupted(
                            file.absolute_path.clone(),
                        ));
                    }

                    let outcome = self.fingerprinter.fingerprint(file, policy);
                    if let Some(callback) = callback {
                        let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        callback.on_progress(current, &file.path.to_string_lossy());
                        callback.on_item_completed(file.size);
                    }
                    outcome
                })
                .collect()
        });

        if let Some(callback) = callback {
            callback.on_phase_end("fingerprint");
        }

        Ok(outcomes)
    }
}
