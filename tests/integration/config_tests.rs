use dedupe::config::{Config, ConfigError, ENV_PREFIX};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.io_threads, 4);
    assert!(!config.metadata_checksum_first);
    assert!(config.exclude_patterns.is_empty());
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DEDUPE_TEST_ENV__IO_THREADS", "16");
    std::env::set_var("DEDUPE_TEST_ENV__METADATA_CHECKSUM_FIRST", "true");
    std::env::set_var("DEDUPE_TEST_ENV__EXCLUDE_PATTERNS", "[\"*.iso\", \"*.tmp\"]");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("DEDUPE_TEST_ENV__"));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config.io_threads, 16);
    assert!(config.metadata_checksum_first);
    assert_eq!(config.exclude_patterns, vec!["*.iso", "*.tmp"]);

    std::env::remove_var("DEDUPE_TEST_ENV__IO_THREADS");
    std::env::remove_var("DEDUPE_TEST_ENV__METADATA_CHECKSUM_FIRST");
    std::env::remove_var("DEDUPE_TEST_ENV__EXCLUDE_PATTERNS");
}

#[test]
fn test_env_prefix() {
    assert_eq!(ENV_PREFIX, "DEDUPE_");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r##"
exclude_patterns = ["*.iso"]
reserved_dir_markers = ["@eaDir", "#recycle"]
reserved_file_names = [".DS_Store", "Thumbs.db"]
io_threads = 8
follow_symlinks = true
skip_empty = true
rm_script_dir = "/volume1/scripts"
mmap_threshold = 1048576
"##;
    fs::write(&config_path, toml_content).unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.exclude_patterns, vec!["*.iso"]);
    assert_eq!(config.reserved_dir_markers, vec!["@eaDir", "#recycle"]);
    assert_eq!(config.reserved_file_names, vec![".DS_Store", "Thumbs.db"]);
    assert_eq!(config.io_threads, 8);
    assert!(config.follow_symlinks);
    assert!(config.skip_empty);
    assert_eq!(config.rm_script_dir, Some(PathBuf::from("/volume1/scripts")));
    assert_eq!(config.mmap_threshold, 1_048_576);
}

#[test]
fn test_config_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("dedupe.toml");
    fs::write(&config_path, "skip_empty = true\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert!(config.skip_empty);
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "this is not [valid toml").unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let result = Config::load(Some(&temp_dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}
