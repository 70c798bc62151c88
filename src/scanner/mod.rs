//! Scanner module for directory traversal and file fingerprint inputs.
//!
//! This module provides functionality for:
//! - Directory walking using jwalk, in a stable per-directory order
//! - `find -path` style exclusion globs and reserved system markers
//! - Content hashing with BLAKE3
//! - Image metadata extraction for metadata-first fingerprints
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming or memory-mapped)
//! - [`metadata`]: Normalized textual metadata for images
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::default().with_patterns(vec!["*.iso".to_string()]);
//! let walker = Walker::new(Path::new("."), config).unwrap();
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod metadata;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

// Re-export main types
pub use hasher::{hash_to_hex, Hash, Hasher};
pub use metadata::{ImageMetadataExtractor, MetadataError, MetadataExtractor};
pub use walker::{validate_root, Walker};

/// Directory markers skipped by default (Synology thumbnail folders).
pub const DEFAULT_RESERVED_DIR_MARKERS: &[&str] = &["@eaDir"];

/// File names skipped by default (Finder desktop metadata).
pub const DEFAULT_RESERVED_FILE_NAMES: &[&str] = &[".DS_Store"];

/// A file discovered during a scan.
///
/// Entries are created by the walker and never mutated afterwards. The
/// relative `path` is the identity of the file within one scan, while
/// `scan_index` records the order in which the walker produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the scan root
    pub path: PathBuf,
    /// Absolute path (scan root joined with `path`)
    pub absolute_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Base name, NFC-normalized. Only populated for name-based grouping.
    pub name: Option<String>,
    /// Position in scan order (0-based)
    pub scan_index: usize,
}

impl FileEntry {
    /// Create a new FileEntry.
    ///
    /// # Arguments
    ///
    /// * `path` - Path relative to the scan root
    /// * `absolute_path` - Absolute path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, absolute_path: PathBuf, size: u64) -> Self {
        Self {
            path,
            absolute_path,
            size,
            name: None,
            scan_index: 0,
        }
    }

    /// Attach the base name used by name-based grouping.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the scan-order position.
    #[must_use]
    pub fn with_scan_index(mut self, scan_index: usize) -> Self {
        self.scan_index = scan_index;
        self
    }

    /// The file extension with its leading dot (e.g. `.jpg`), if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }
}

/// Configuration for directory walking.
///
/// Controls exclusion, symlink handling, and other walk behavior.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip zero-byte files.
    pub skip_empty: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Exclusion globs, matched against the absolute path like `find -path`.
    /// A file is excluded if it matches any of them.
    pub exclude_patterns: Vec<String>,

    /// Any path containing one of these strings is skipped.
    pub reserved_dir_markers: Vec<String>,

    /// Files with exactly one of these names are skipped.
    pub reserved_file_names: Vec<String>,

    /// Record NFC-normalized base names on each entry.
    pub capture_names: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_empty: false,
            min_size: None,
            max_size: None,
            exclude_patterns: Vec::new(),
            reserved_dir_markers: DEFAULT_RESERVED_DIR_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
            reserved_file_names: DEFAULT_RESERVED_FILE_NAMES
                .iter()
                .map(ToString::to_string)
                .collect(),
            capture_names: false,
        }
    }
}

impl WalkerConfig {
    /// Set the exclusion globs.
    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Set the minimum size filter.
    #[must_use]
    pub fn with_min_size(mut self, min_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the maximum size filter.
    #[must_use]
    pub fn with_max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }

    /// Skip zero-byte files.
    #[must_use]
    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    /// Follow symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Replace the reserved directory markers.
    #[must_use]
    pub fn with_reserved_dir_markers(mut self, markers: Vec<String>) -> Self {
        self.reserved_dir_markers = markers;
        self
    }

    /// Replace the reserved file names.
    #[must_use]
    pub fn with_reserved_file_names(mut self, names: Vec<String>) -> Self {
        self.reserved_file_names = names;
        self
    }

    /// Record base names on each entry.
    #[must_use]
    pub fn with_capture_names(mut self, capture_names: bool) -> Self {
        self.capture_names = capture_names;
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An exclusion glob could not be compiled.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending glob
        pattern: String,
        /// The underlying glob error
        #[source]
        source: globset::Error,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing was cancelled by a shutdown request.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(error),
            },
        }
    }

    /// Whether this error was caused by a shutdown request.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}
