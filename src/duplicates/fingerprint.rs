//! Fingerprints: the comparison keys that confirm two candidates are equal.
//!
//! A fingerprint is a BLAKE3 digest tagged with the domain it was computed
//! in. Content fingerprints hash every byte of the file; metadata
//! fingerprints hash the normalized description produced by a
//! [`MetadataExtractor`]. Fingerprints from different domains never compare
//! equal.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::scanner::{hash_to_hex, FileEntry, Hash, HashError, Hasher};
use crate::scanner::{ImageMetadataExtractor, MetadataExtractor};

/// What a fingerprint digest was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashDomain {
    /// Normalized metadata text
    Metadata,
    /// Full file content
    Content,
}

impl fmt::Display for HashDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// A domain-tagged digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Domain the digest belongs to
    pub domain: HashDomain,
    /// BLAKE3 digest
    pub hash: Hash,
}

impl Fingerprint {
    /// A content fingerprint.
    #[must_use]
    pub fn content(hash: Hash) -> Self {
        Self {
            domain: HashDomain::Content,
            hash,
        }
    }

    /// A metadata fingerprint.
    #[must_use]
    pub fn metadata(hash: Hash) -> Self {
        Self {
            domain: HashDomain::Metadata,
            hash,
        }
    }

    /// Digest as hexadecimal string.
    #[must_use]
    pub fn hex(&self) -> String {
        hash_to_hex(&self.hash)
    }
}

/// How fingerprints are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintPolicy {
    /// Hash the full content of every file.
    #[default]
    ContentOnly,
    /// Hash image metadata, falling back to content when extraction fails.
    MetadataFirst,
}

/// Result of fingerprinting one file.
#[derive(Debug, Clone)]
pub enum FingerprintOutcome {
    /// Digest of the file's metadata text
    MetadataHash(Hash),
    /// Digest of the file's content
    ContentHash(Hash),
    /// Neither metadata nor content could be read
    Unreadable(HashError),
}

impl FingerprintOutcome {
    /// The fingerprint, if the file was readable.
    #[must_use]
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        match self {
            Self::MetadataHash(hash) => Some(Fingerprint::metadata(*hash)),
            Self::ContentHash(hash) => Some(Fingerprint::content(*hash)),
            Self::Unreadable(_) => None,
        }
    }

    /// Check if the digest covers metadata.
    #[must_use]
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::MetadataHash(_))
    }

    /// Check if the digest covers content.
    #[must_use]
    pub fn is_content(&self) -> bool {
        matches!(self, Self::ContentHash(_))
    }
}

/// Computes fingerprints for file entries.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    hasher: Hasher,
    extractor: Arc<dyn MetadataExtractor>,
}

impl Fingerprinter {
    /// Create a fingerprinter using the image metadata extractor.
    #[must_use]
    pub fn new(hasher: Hasher) -> Self {
        Self {
            hasher,
            extractor: Arc::new(ImageMetadataExtractor::new()),
        }
    }

    /// Replace the metadata extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fingerprint one file under the given policy.
    ///
    /// Under [`FingerprintPolicy::MetadataFirst`] a failed extraction is
    /// logged and the content is hashed instead.
    #[must_use]
    pub fn fingerprint(&self, entry: &FileEntry, policy: FingerprintPolicy) -> FingerprintOutcome {
        match policy {
            FingerprintPolicy::ContentOnly => self.content(entry),
            FingerprintPolicy::MetadataFirst => {
                match self.extractor.extract(&entry.absolute_path) {
                    Ok(text) => {
                        FingerprintOutcome::MetadataHash(self.hasher.hash_bytes(text.as_bytes()))
                    }
                    Err(e) => {
                        log::info!(
                            "Metadata reading failed for {}, hashing its content instead: {}",
                            entry.path.display(),
                            e
                        );
                        self.content(entry)
                    }
                }
            }
        }
    }

    /// Fingerprint one file by content.
    #[must_use]
    pub fn content(&self, entry: &FileEntry) -> FingerprintOutcome {
        match self.hasher.full_hash(&entry.absolute_path) {
            Ok(hash) => FingerprintOutcome::ContentHash(hash),
            Err(e) => FingerprintOutcome::Unreadable(e),
        }
    }

    /// Bring every outcome of one candidate group into a single domain.
    ///
    /// When a group mixes metadata and content digests, the metadata ones are
    /// recomputed by content. Returns true if anything was recomputed.
    pub fn unify_domain(&self, files: &[FileEntry], outcomes: &mut [FingerprintOutcome]) -> bool {
        debug_assert_eq!(files.len(), outcomes.len());

        let has_metadata = outcomes.iter().any(FingerprintOutcome::is_metadata);
        let has_content = outcomes.iter().any(FingerprintOutcome::is_content);
        if !(has_metadata && has_content) {
            return false;
        }

        for (file, outcome) in files.iter().zip(outcomes.iter_mut()) {
            if outcome.is_metadata() {
                *outcome = self.content(file);
            }
        }
        true
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(Hasher::new())
    }
}
