//! JSON output formatter for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "fingerprint": "abc123...",
//!       "domain": "content",
//!       "size": 1024,
//!       "keep": "/root/a/1.jpg",
//!       "remove": ["/root/b/1.jpg"]
//!     }
//!   ],
//!   "extensions": [".jpg"],
//!   "script_path": null,
//!   "summary": {
//!     "root": "/root",
//!     "total_files": 3,
//!     "duplicate_groups": 1,
//!     "reclaimable_space": 1024,
//!     "scan_duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "DD000"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::duplicates::{DuplicateSet, HashDomain, ScanSummary};
use crate::error::ExitCode;
use crate::plan::DeletionPlan;

/// A single duplicate set in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateSet {
    /// BLAKE3 digest as hexadecimal string (64 characters)
    pub fingerprint: String,
    /// What the digest covers
    pub domain: HashDomain,
    /// File size in bytes
    pub size: u64,
    /// Absolute path of the kept file
    pub keep: String,
    /// Absolute paths proposed for removal
    pub remove: Vec<String>,
}

impl JsonDuplicateSet {
    /// Create a JSON set from a DuplicateSet.
    #[must_use]
    pub fn from_duplicate_set(set: &DuplicateSet) -> Self {
        Self {
            fingerprint: set.fingerprint.hex(),
            domain: set.domain(),
            size: set.size(),
            keep: path_string(&set.keep().absolute_path),
            remove: set
                .removals()
                .iter()
                .map(|f| path_string(&f.absolute_path))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Absolute scan root
    pub root: String,
    /// When the plan was built (RFC 3339)
    pub generated_at: String,
    /// Exclusion globs in effect
    pub exclude_patterns: Vec<String>,
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Files eliminated by grouping
    pub eliminated_by_size: usize,
    /// Number of candidate groups
    pub candidate_groups: usize,
    /// Files compared by metadata digest
    pub metadata_fingerprints: usize,
    /// Files compared by content digest
    pub content_fingerprints: usize,
    /// Groups re-fingerprinted by content
    pub domain_fallback_groups: usize,
    /// Files skipped as unreadable
    pub unreadable_files: usize,
    /// Walk errors
    pub scan_errors: usize,
    /// Number of confirmed duplicate sets
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding kept files)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a plan, its scan summary and an exit code.
    #[must_use]
    pub fn new(plan: &DeletionPlan, summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            root: path_string(&plan.root),
            generated_at: plan.generated_at.to_rfc3339(),
            exclude_patterns: plan.exclude_patterns.clone(),
            total_files: summary.total_files,
            total_size: summary.total_size,
            eliminated_by_size: summary.eliminated_by_size,
            candidate_groups: summary.candidate_groups,
            metadata_fingerprints: summary.metadata_fingerprints,
            content_fingerprints: summary.content_fingerprints,
            domain_fallback_groups: summary.domain_fallback_groups,
            unreadable_files: summary.unreadable_files,
            scan_errors: summary.scan_errors,
            duplicate_groups: plan.len(),
            duplicate_files: plan.removal_count(),
            reclaimable_space: plan.reclaimable_space(),
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Confirmed duplicate sets
    pub duplicates: Vec<JsonDuplicateSet>,
    /// Sorted extensions seen among duplicates
    pub extensions: Vec<String>,
    /// Path of the written deletion script, if any
    pub script_path: Option<String>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from a plan, summary and exit code.
    #[must_use]
    pub fn new(plan: &DeletionPlan, summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: plan
                .sets
                .iter()
                .map(JsonDuplicateSet::from_duplicate_set)
                .collect(),
            extensions: plan.extensions.iter().cloned().collect(),
            script_path: None,
            summary: JsonSummary::new(plan, summary, exit_code),
        }
    }

    /// Record where the deletion script was written.
    #[must_use]
    pub fn with_script_path(mut self, path: Option<&Path>) -> Self {
        self.script_path = path.map(path_string);
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
