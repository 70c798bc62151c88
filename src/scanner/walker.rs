//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and collecting the files that take part in duplicate detection.
//! Children of every directory are sorted by file name, so two walks over an
//! unchanged tree yield the same entries in the same order.
//!
//! # Features
//!
//! - Exclusion globs matched against the absolute path, `find -path` style
//!   (a `*` also matches `/`)
//! - Reserved system artifacts (`@eaDir` folders, `.DS_Store` files)
//! - Optional symlink following
//! - Size filtering (min/max) and optional skipping of empty files
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::default()
//!     .with_patterns(vec!["*.iso".to_string(), "*/my subdir/*".to_string()]);
//!
//! let walker = Walker::new(Path::new("/volume1/photo"), config).unwrap();
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jwalk::WalkDir;
use unicode_normalization::UnicodeNormalization;

use super::{FileEntry, ScanError, WalkerConfig};

/// Check that `root` exists, is a directory and can be listed.
///
/// Returns the absolute form of the root (not canonicalized, so symlinked
/// roots keep the path the user typed).
///
/// # Errors
///
/// Returns [`ScanError::NotFound`], [`ScanError::NotADirectory`] or
/// [`ScanError::PermissionDenied`] when the root cannot be scanned.
pub fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    // A directory that cannot be listed would silently yield nothing
    std::fs::read_dir(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    std::path::absolute(root).map_err(|source| ScanError::Io {
        path: root.to_path_buf(),
        source,
    })
}

/// Compile exclusion globs into one matcher.
///
/// # Errors
///
/// Returns [`ScanError::InvalidPattern`] for the first glob that fails to
/// compile.
pub fn build_exclusions(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::InvalidPattern {
        pattern: patterns.join(" "),
        source,
    })
}

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Absolute root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Compiled exclusion globs
    exclusions: GlobSet,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    ///
    /// # Errors
    ///
    /// Fails if an exclusion glob is invalid or the root cannot be made
    /// absolute.
    pub fn new(path: &Path, config: WalkerConfig) -> Result<Self, ScanError> {
        let exclusions = build_exclusions(&config.exclude_patterns)?;
        let root = std::path::absolute(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            root,
            config,
            exclusions,
            shutdown_flag: None,
        })
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops iteration as soon as
    /// it next checks the flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The absolute root this walker scans.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Whether a path contains a reserved marker or carries a reserved name.
    fn is_reserved(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if self
            .config
            .reserved_dir_markers
            .iter()
            .any(|marker| path_str.contains(marker.as_str()))
        {
            return true;
        }

        path.file_name().is_some_and(|name| {
            self.config
                .reserved_file_names
                .iter()
                .any(|reserved| name == reserved.as_str())
        })
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if self.config.skip_empty && size == 0 {
            return false;
        }
        if let Some(min) = self.config.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.config.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Returns a lazy iterator over [`FileEntry`] results. Errors are yielded
    /// as [`ScanError`] values rather than stopping iteration. Each yielded
    /// entry carries its position in the walk as `scan_index`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dedupe::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default()).unwrap();
    /// let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let markers = self.config.reserved_dir_markers.clone();
        let mut next_index = 0usize;

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                // Prune reserved directories before jwalk descends into them
                children.retain(|child| match child {
                    Ok(entry) => {
                        !(entry.file_type().is_dir()
                            && markers.iter().any(|marker| {
                                entry.file_name().to_string_lossy().contains(marker.as_str())
                            }))
                    }
                    Err(_) => true,
                });
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| {
                let result = match entry_result {
                    Ok(mut entry) => {
                        let path = entry.path();
                        let file_type = entry.file_type();
                        if file_type.is_dir() {
                            // jwalk keeps a failed read_dir on the directory entry
                            return entry
                                .read_children_error
                                .take()
                                .map(|e| self.handle_jwalk_error(path, e));
                        }
                        if path == self.root {
                            return None;
                        }
                        if file_type.is_symlink() && !self.config.follow_symlinks {
                            log::trace!("Skipping symlink: {}", path.display());
                            return None;
                        }
                        self.process_file_entry(path)?
                    }
                    Err(e) => {
                        let path = e
                            .path()
                            .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                        self.handle_jwalk_error(path, e)
                    }
                };

                Some(result.map(|entry| {
                    let entry = entry.with_scan_index(next_index);
                    next_index += 1;
                    entry
                }))
            })
    }

    /// Apply exclusions and filters, then build the entry.
    fn process_file_entry(&self, path: PathBuf) -> Option<Result<FileEntry, ScanError>> {
        if self.is_reserved(&path) {
            log::trace!("Skipping reserved artifact: {}", path.display());
            return None;
        }

        if self.exclusions.is_match(&path) {
            log::trace!("Excluded by pattern: {}", path.display());
            return None;
        }

        let metadata = if self.config.follow_symlinks {
            std::fs::metadata(&path)
        } else {
            std::fs::symlink_metadata(&path)
        };
        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => return Some(self.handle_io_error(&path, e)),
        };

        // Sockets, fifos and devices are not files worth comparing
        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if !self.passes_size_filter(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                path.display()
            );
            return None;
        }

        let relative = path
            .strip_prefix(&self.root)
            .map_or_else(|_| path.clone(), Path::to_path_buf);

        let mut entry = FileEntry::new(relative, path, size);
        if self.config.capture_names {
            if let Some(name) = entry.absolute_path.file_name() {
                let normalized: String = name.to_string_lossy().nfc().collect();
                entry = entry.with_name(normalized);
            }
        }

        Some(Ok(entry))
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> Result<FileEntry, ScanError> {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                Err(ScanError::PermissionDenied(path.to_path_buf()))
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                Err(ScanError::NotFound(path.to_path_buf()))
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                Err(ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                })
            }
        }
    }

    /// Handle jwalk errors (typically unreadable directories).
    fn handle_jwalk_error(
        &self,
        path: PathBuf,
        error: jwalk::Error,
    ) -> Result<FileEntry, ScanError> {
        log::warn!("Walker error for {}: {}", path.display(), error);
        match error.io_error().map(std::io::Error::kind) {
            Some(std::io::ErrorKind::PermissionDenied) => Err(ScanError::PermissionDenied(path)),
            _ => Err(ScanError::Io {
                path,
                source: std::io::Error::other(error.to_string()),
            }),
        }
    }
}
