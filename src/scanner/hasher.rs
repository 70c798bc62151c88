//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes of
//! file contents. Small files are read through a fixed buffer; files at or
//! above the memory-map threshold are mapped and hashed in one pass.
//!
//! The shutdown flag is checked between buffer reads, so hashing a large
//! file can be interrupted.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memmap2::Mmap;

use super::HashError;

/// A BLAKE3 digest.
pub type Hash = [u8; 32];

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default size at which files are memory-mapped (64 MiB).
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from_bytes(*hash).to_hex().to_string()
}

/// Parse a 64 character hex digest.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}

/// File content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    use_mmap: bool,
    mmap_threshold: u64,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with default buffer size and mmap threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            shutdown_flag: None,
        }
    }

    /// Enable or disable memory-mapped hashing.
    #[must_use]
    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Files of at least this many bytes are memory-mapped.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Set the streaming read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Set the shutdown flag checked between reads.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> Hash {
        *blake3::hash(data).as_bytes()
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, or
    /// [`HashError::Interrupted`] if shutdown was requested.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        if self.is_shutdown_requested() {
            return Err(HashError::Interrupted(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        if self.use_mmap && len > 0 && len >= self.mmap_threshold {
            match self.mmap_hash(&file) {
                Ok(hash) => return Ok(hash),
                Err(e) => log::debug!(
                    "Memory map failed for {}, streaming instead: {}",
                    path.display(),
                    e
                ),
            }
        }

        self.stream_hash(file, path)
    }

    fn mmap_hash(&self, file: &File) -> std::io::Result<Hash> {
        // SAFETY: the mapping is read-only and dropped before returning. A
        // file truncated concurrently may raise SIGBUS, which is the accepted
        // cost of mapping files we do not own.
        let mmap = unsafe { Mmap::map(file)? };
        let mut hasher = blake3::Hasher::new();
        hasher.update(&mmap);
        Ok(*hasher.finalize().as_bytes())
    }

    fn stream_hash(&self, mut file: File, path: &Path) -> Result<Hash, HashError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        Ok(*hasher.finalize().as_bytes())
    }
}
