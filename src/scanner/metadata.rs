//! Normalized textual metadata for metadata-first fingerprints.
//!
//! A [`MetadataExtractor`] turns a file into a stable text description that
//! is hashed instead of the full content. Extraction is expected to fail for
//! anything that is not a recognizable image; callers then fall back to
//! content hashing.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{ImageDecoder, ImageReader};

/// Errors raised while extracting metadata.
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    /// The file could not be opened or read.
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        /// File being read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file format was not recognized as an image.
    #[error("Not a recognized image: {0}")]
    NotAnImage(PathBuf),

    /// The image header could not be decoded.
    #[error("Cannot decode {path}: {source}")]
    Decode {
        /// File being decoded
        path: PathBuf,
        /// The underlying decoder error
        #[source]
        source: image::ImageError,
    },

    /// The image carries no EXIF block, so its metadata would not tell
    /// copies apart from other shots with the same geometry.
    #[error("No EXIF metadata in {0}")]
    NoExif(PathBuf),
}

/// Produces a normalized metadata description of a file.
///
/// Implementations must be deterministic: the same file yields the same
/// text on every call.
pub trait MetadataExtractor: Send + Sync + fmt::Debug {
    /// Extract the metadata text for `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] when no usable metadata exists. This is
    /// not fatal; the caller hashes content instead.
    fn extract(&self, path: &Path) -> Result<String, MetadataError>;
}

/// Metadata extractor backed by the `image` crate's decoders.
///
/// Reads only headers and metadata chunks, never pixel data. The output
/// lists container format, dimensions and colour type, followed by BLAKE3
/// digests of the EXIF and ICC payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageMetadataExtractor;

impl ImageMetadataExtractor {
    /// Create a new extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for ImageMetadataExtractor {
    fn extract(&self, path: &Path) -> Result<String, MetadataError> {
        let unreadable = |source| MetadataError::Unreadable {
            path: path.to_path_buf(),
            source,
        };
        let decode = |source| MetadataError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let reader = ImageReader::open(path)
            .map_err(unreadable)?
            .with_guessed_format()
            .map_err(unreadable)?;
        let format = reader
            .format()
            .ok_or_else(|| MetadataError::NotAnImage(path.to_path_buf()))?;

        let mut decoder = reader.into_decoder().map_err(decode)?;
        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        let exif = decoder
            .exif_metadata()
            .map_err(decode)?
            .ok_or_else(|| MetadataError::NoExif(path.to_path_buf()))?;
        let icc = decoder.icc_profile().map_err(decode)?;

        Ok(format!(
            "format: {:?}\nwidth: {}\nheight: {}\ncolor: {:?}\nexif: {}\nicc: {}\n",
            format,
            width,
            height,
            color,
            blake3::hash(&exif).to_hex(),
            icc.map_or_else(|| "none".to_string(), |p| blake3::hash(&p).to_hex().to_string()),
        ))
    }
}
