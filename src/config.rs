//! Application configuration management.
//!
//! Settings are merged from, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config <FILE>`, or `config.toml` in the platform config
//!    directory)
//! 3. `DEDUPE_*` environment variables (`DEDUPE_IO_THREADS=8`)
//! 4. Command-line flags, applied by the caller
//!
//! ```toml
//! exclude_patterns = ["*.iso", "*/tmp/*"]
//! metadata_checksum_first = true
//! io_threads = 8
//! rm_script_dir = "/volume1/scripts"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD;
use crate::scanner::{DEFAULT_RESERVED_DIR_MARKERS, DEFAULT_RESERVED_FILE_NAMES};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "DEDUPE_";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A value parsed but is out of range.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exclusion globs, OR-combined, matched against absolute paths
    pub exclude_patterns: Vec<String>,
    /// Path components marking reserved directories to skip
    pub reserved_dir_markers: Vec<String>,
    /// File names always skipped
    pub reserved_file_names: Vec<String>,
    /// Compare images by metadata digest before content
    pub metadata_checksum_first: bool,
    /// Fingerprinting parallelism
    pub io_threads: usize,
    /// Follow symbolic links during the walk
    pub follow_symlinks: bool,
    /// Ignore zero-byte files
    pub skip_empty: bool,
    /// Directory for the deletion script (current directory if unset)
    pub rm_script_dir: Option<PathBuf>,
    /// Files at least this large are memory-mapped for hashing
    pub mmap_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            reserved_dir_markers: DEFAULT_RESERVED_DIR_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            reserved_file_names: DEFAULT_RESERVED_FILE_NAMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            metadata_checksum_first: false,
            io_threads: 4,
            follow_symlinks: false,
            skip_empty: false,
            rm_script_dir: None,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// With `explicit` set, that file must exist. Otherwise the platform
    /// default path is used when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the explicit file is missing, a layer is
    /// malformed, or a value is out of range.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };

        match file {
            Some(ref path) => log::debug!("Loading config from {}", path.display()),
            None => log::debug!("No config file, using defaults and environment"),
        }

        let figment = Self::figment(file.as_deref()).merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Load defaults merged with a single TOML file, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is malformed or a value is out of range.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::from_figment(Self::figment(Some(path)))
    }

    /// Defaults, optionally merged with a TOML file.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        }
    }

    /// Extract and validate a configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "io_threads",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Default platform-specific configuration file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dedupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::from_figment(Config::figment(None)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.io_threads, 4);
        assert_eq!(config.reserved_dir_markers, vec!["@eaDir".to_string()]);
        assert_eq!(config.reserved_file_names, vec![".DS_Store".to_string()]);
        assert!(config.rm_script_dir.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
exclude_patterns = ["*.iso", "*/my subdir/*"]
metadata_checksum_first = true
io_threads = 8
rm_script_dir = "/tmp/scripts"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.exclude_patterns, vec!["*.iso", "*/my subdir/*"]);
        assert!(config.metadata_checksum_first);
        assert_eq!(config.io_threads, 8);
        assert_eq!(config.rm_script_dir, Some(PathBuf::from("/tmp/scripts")));
        // Untouched keys keep their defaults
        assert_eq!(config.reserved_dir_markers, vec!["@eaDir".to_string()]);
    }

    #[test]
    fn test_env_layer_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "io_threads = 8\nskip_empty = true\n").unwrap();

        let figment = Config::figment(Some(&path))
            .merge(Serialized::default("io_threads", 2))
            .merge(Serialized::default("follow_symlinks", true));
        let config = Config::from_figment(figment).unwrap();

        assert_eq!(config.io_threads, 2);
        assert!(config.skip_empty);
        assert!(config.follow_symlinks);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "io_threads = \"many\"").unwrap();

        let result = Config::load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "io_threads = 0").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("io_threads"));
    }

    #[test]
    fn test_explicit_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/dedupe.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
