//! Deletion plan: which file of each duplicate set to keep and which to remove.
//!
//! The plan is built once per run from the confirmed duplicate sets. It never
//! deletes anything; [`crate::output::script::ScriptOutput`] renders it as a
//! shell script that a human reviews and runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::duplicates::DuplicateSet;

/// Ordered duplicate sets plus the context they were found in.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    /// When the plan was built
    pub generated_at: DateTime<Local>,
    /// Absolute scan root
    pub root: PathBuf,
    /// Exclusion globs in effect
    pub exclude_patterns: Vec<String>,
    /// Extensions (with leading dot) seen among all duplicate files
    pub extensions: BTreeSet<String>,
    /// Sets in scan order of their kept file
    pub sets: Vec<DuplicateSet>,
}

impl DeletionPlan {
    /// Build a plan stamped with the current local time.
    ///
    /// Keep-first: in every set the file with the lowest scan index is kept
    /// and all others are proposed for removal.
    #[must_use]
    pub fn build(root: &Path, exclude_patterns: &[String], sets: Vec<DuplicateSet>) -> Self {
        Self::build_at(root, exclude_patterns, sets, Local::now())
    }

    /// Build a plan with an explicit timestamp.
    #[must_use]
    pub fn build_at(
        root: &Path,
        exclude_patterns: &[String],
        mut sets: Vec<DuplicateSet>,
        generated_at: DateTime<Local>,
    ) -> Self {
        sets.sort_by_key(|set| set.keep().scan_index);

        let extensions = sets
            .iter()
            .flat_map(|set| set.files.iter())
            .filter_map(|file| file.extension())
            .collect();

        Self {
            generated_at,
            root: root.to_path_buf(),
            exclude_patterns: exclude_patterns.to_vec(),
            extensions,
            sets,
        }
    }

    /// Check if there is nothing to remove.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of duplicate sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Number of files proposed for removal.
    #[must_use]
    pub fn removal_count(&self) -> usize {
        self.sets.iter().map(|s| s.removals().len()).sum()
    }

    /// Bytes freed if every removal is carried out.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        self.sets.iter().map(DuplicateSet::wasted_space).sum()
    }

    /// Extensions joined by spaces, e.g. `.jpg .mp4`.
    #[must_use]
    pub fn extensions_line(&self) -> String {
        self.extensions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Default script file name, `rm_dupes_<YYYY-MM-DD-HHhMMmSSs>.sh`.
    #[must_use]
    pub fn script_file_name(&self) -> String {
        format!(
            "rm_dupes_{}.sh",
            self.generated_at.format("%Y-%m-%d-%Hh%Mm%Ss")
        )
    }
}
