//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size (or name and size) grouping (Phase 1)
//! - Metadata-first or content fingerprinting (Phase 2)
//! - Refinement of candidate groups into confirmed sets (Phase 3)

pub mod finder;
pub mod fingerprint;
pub mod groups;

pub use finder::{
    refine, AmbiguityPolicy, DuplicateFinder, FinderConfig, FinderError, GroupingMode,
    ScanSummary,
};
pub use fingerprint::{
    Fingerprint, FingerprintOutcome, FingerprintPolicy, Fingerprinter, HashDomain,
};
pub use groups::{
    group_by_name_and_size, group_by_size, CandidateGroup, DuplicateSet, GroupKey, GroupingStats,
};
