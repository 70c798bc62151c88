//! Candidate grouping and confirmed duplicate sets.
//!
//! # Overview
//!
//! Grouping is the first filter of duplicate detection. Files are grouped by
//! their exact size (or, in name mode, by base name and size). Files with a
//! unique key cannot have a duplicate and are dropped before any file is
//! opened.
//!
//! Output order is deterministic: groups are ordered by the scan index of
//! their first member and members keep scan order.
//!
//! # Example
//!
//! ```
//! use dedupe::scanner::FileEntry;
//! use dedupe::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileEntry::new(PathBuf::from("a.txt"), PathBuf::from("/r/a.txt"), 100).with_scan_index(0),
//!     FileEntry::new(PathBuf::from("b.txt"), PathBuf::from("/r/b.txt"), 100).with_scan_index(1),
//!     FileEntry::new(PathBuf::from("c.txt"), PathBuf::from("/r/c.txt"), 200).with_scan_index(2),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].len(), 2);
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.eliminated_unique, 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use super::fingerprint::{Fingerprint, HashDomain};
use crate::scanner::FileEntry;

/// The cheap key shared by all members of a candidate group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Exact file size in bytes
    Size(u64),
    /// NFC-normalized base name and exact size
    NameAndSize(String, u64),
}

impl GroupKey {
    /// The size component of the key.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::Size(size) | Self::NameAndSize(_, size) => *size,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => write!(f, "size {size} bytes"),
            Self::NameAndSize(name, size) => write!(f, "name \"{name}\" and size {size} bytes"),
        }
    }
}

/// Files sharing a [`GroupKey`], awaiting fingerprint comparison.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    /// Key shared by every member
    pub key: GroupKey,
    /// Members in scan order
    pub files: Vec<FileEntry>,
}

impl CandidateGroup {
    /// Create a candidate group.
    #[must_use]
    pub fn new(key: GroupKey, files: Vec<FileEntry>) -> Self {
        Self { key, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Scan index of the earliest member.
    #[must_use]
    pub fn first_scan_index(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.scan_index)
            .min()
            .unwrap_or(usize::MAX)
    }
}

/// Confirmed set of equivalent files.
///
/// Always holds at least two files sorted by scan order. The first file is
/// kept; the others are proposed for removal.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    /// Key of the candidate group the set came from
    pub key: GroupKey,
    /// Fingerprint shared by every file
    pub fingerprint: Fingerprint,
    /// Files sorted by scan index
    pub files: Vec<FileEntry>,
}

impl DuplicateSet {
    /// Create a set, ordering files by scan index.
    #[must_use]
    pub fn new(key: GroupKey, fingerprint: Fingerprint, mut files: Vec<FileEntry>) -> Self {
        debug_assert!(files.len() >= 2, "a duplicate set needs two files");
        files.sort_by_key(|f| f.scan_index);
        Self {
            key,
            fingerprint,
            files,
        }
    }

    /// File size shared by the set.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.key.size()
    }

    /// Domain the fingerprint was computed in.
    #[must_use]
    pub fn domain(&self) -> HashDomain {
        self.fingerprint.domain
    }

    /// The file to keep.
    #[must_use]
    pub fn keep(&self) -> &FileEntry {
        &self.files[0]
    }

    /// Files proposed for removal.
    #[must_use]
    pub fn removals(&self) -> &[FileEntry] {
        &self.files[1..]
    }

    /// Number of files in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false for a well-formed set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Space freed by removing every copy but the kept one.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size() * self.removals().len() as u64
    }

    /// Relative paths of every file.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Statistics from the grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of distinct keys seen
    pub unique_keys: usize,
    /// Number of files left in groups of 2+
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique
    pub eliminated_unique: usize,
    /// Number of empty files encountered
    pub empty_files: usize,
    /// Number of candidate groups
    pub candidate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by exact size.
///
/// Groups with fewer than two members are removed.
///
/// # Performance
///
/// O(n) in the number of files. No file I/O is performed.
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileEntry>,
) -> (Vec<CandidateGroup>, GroupingStats) {
    let (groups, stats) = group_by_key(files, |file| Some(GroupKey::Size(file.size)));

    log::info!(
        "Phase 1 complete: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (groups, stats)
}

/// Group files by NFC-normalized base name and exact size.
///
/// Files whose entry carries no name fall back to the last path component.
#[must_use]
pub fn group_by_name_and_size(
    files: impl IntoIterator<Item = FileEntry>,
) -> (Vec<CandidateGroup>, GroupingStats) {
    use unicode_normalization::UnicodeNormalization;

    let (groups, stats) = group_by_key(files, |file| {
        let name = match &file.name {
            Some(name) => name.clone(),
            None => file.path.file_name()?.to_string_lossy().nfc().collect(),
        };
        Some(GroupKey::NameAndSize(name, file.size))
    });

    log::info!(
        "Phase 1 complete: {} files → {} potential duplicates by name and size",
        stats.total_files,
        stats.potential_duplicates
    );

    (groups, stats)
}

fn group_by_key<F>(
    files: impl IntoIterator<Item = FileEntry>,
    key_of: F,
) -> (Vec<CandidateGroup>, GroupingStats)
where
    F: Fn(&FileEntry) -> Option<GroupKey>,
{
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut buckets: Vec<(GroupKey, Vec<FileEntry>)> = Vec::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }

        let Some(key) = key_of(&file) else {
            stats.eliminated_unique += 1;
            continue;
        };

        match index.get(&key) {
            Some(&slot) => buckets[slot].1.push(file),
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push((key, vec![file]));
            }
        }
    }

    stats.unique_keys = buckets.len();

    let mut groups: Vec<CandidateGroup> = buckets
        .into_iter()
        .filter_map(|(key, mut files)| {
            if files.len() < 2 {
                stats.eliminated_unique += files.len();
                log::trace!("Eliminated unique file: {}", files[0].path.display());
                return None;
            }
            files.sort_by_key(|f| f.scan_index);
            stats.potential_duplicates += files.len();
            Some(CandidateGroup::new(key, files))
        })
        .collect();

    groups.sort_by_key(CandidateGroup::first_scan_index);
    stats.candidate_groups = groups.len();

    (groups, stats)
}
