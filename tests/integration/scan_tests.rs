use dedupe::duplicates::{
    AmbiguityPolicy, DuplicateFinder, FinderConfig, FinderError, FingerprintPolicy, GroupingMode,
    HashDomain,
};
use dedupe::scanner::{MetadataError, MetadataExtractor, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn write(dir: &TempDir, rel: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// 100 bytes starting with `fill`.
fn hundred(fill: u8) -> Vec<u8> {
    vec![fill; 100]
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (sets, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(sets.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_keep_first_size_match_content_differs() {
    let dir = tempdir().unwrap();
    write(&dir, "a/1.jpg", &hundred(b'X'));
    write(&dir, "b/1.jpg", &hundred(b'X'));
    write(&dir, "c/2.jpg", &hundred(b'Y'));

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert_eq!(set.keep().path, PathBuf::from("a/1.jpg"));
    assert_eq!(set.removals().len(), 1);
    assert_eq!(set.removals()[0].path, PathBuf::from("b/1.jpg"));
    assert!(!set.paths().contains(&PathBuf::from("c/2.jpg")));
    assert_eq!(set.domain(), HashDomain::Content);

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.candidate_groups, 1);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 100);
}

#[test]
fn test_keep_is_absolute_under_root() {
    let dir = tempdir().unwrap();
    write(&dir, "a/1.jpg", &hundred(b'X'));
    write(&dir, "b/1.jpg", &hundred(b'X'));

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    let keep = &sets[0].keep().absolute_path;
    assert!(keep.is_absolute());
    assert!(keep.starts_with(&summary.root));
    assert!(keep.ends_with("a/1.jpg"));
}

#[test]
fn test_excluded_iso_pair_yields_nothing() {
    let dir = tempdir().unwrap();
    write(&dir, "disc.iso", b"image bytes");
    write(&dir, "copy/disc.iso", b"image bytes");
    write(&dir, "note.txt", b"unique");

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::default().with_patterns(vec!["*.iso".to_string()]));
    let (sets, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(sets.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[test]
fn test_excluded_files_never_in_sets() {
    let dir = tempdir().unwrap();
    write(&dir, "keep/a.txt", b"same");
    write(&dir, "keep/b.txt", b"same");
    write(&dir, "my subdir/c.txt", b"same");

    let config = FinderConfig::default().with_walker_config(
        WalkerConfig::default().with_patterns(vec!["*/my subdir/*".to_string()]),
    );
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
    assert!(sets[0]
        .files
        .iter()
        .all(|f| !f.path.starts_with("my subdir")));
}

#[test]
fn test_single_family_with_odd_one_out() {
    let dir = tempdir().unwrap();
    write(&dir, "a/x.bin", b"AAAA");
    write(&dir, "b/x.bin", b"BBBB");
    write(&dir, "c/x.bin", b"AAAA");

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(
        sets[0].paths(),
        vec![PathBuf::from("a/x.bin"), PathBuf::from("c/x.bin")]
    );
}

#[test]
fn test_two_families_are_ambiguous() {
    let dir = tempdir().unwrap();
    write(&dir, "a/x.bin", b"AAAA");
    write(&dir, "b/x.bin", b"BBBB");
    write(&dir, "c/x.bin", b"AAAA");
    write(&dir, "d/x.bin", b"BBBB");

    let err = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap_err();

    match err {
        FinderError::AmbiguousGroup { families, paths, .. } => {
            assert_eq!(families, 2);
            assert_eq!(paths.len(), 4);
        }
        other => panic!("expected AmbiguousGroup, got {other:?}"),
    }
}

#[test]
fn test_two_families_split() {
    let dir = tempdir().unwrap();
    write(&dir, "a/x.bin", b"AAAA");
    write(&dir, "b/x.bin", b"BBBB");
    write(&dir, "c/x.bin", b"AAAA");
    write(&dir, "d/x.bin", b"BBBB");

    let config = FinderConfig::default().with_ambiguity(AmbiguityPolicy::Split);
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].keep().path, PathBuf::from("a/x.bin"));
    assert_eq!(sets[1].keep().path, PathBuf::from("b/x.bin"));
}

#[test]
fn test_by_name_separates_equal_content() {
    let dir = tempdir().unwrap();
    write(&dir, "a/photo.jpg", b"pixels");
    write(&dir, "b/photo.jpg", b"pixels");
    write(&dir, "c/other.jpg", b"pixels");

    let config = FinderConfig::default().with_mode(GroupingMode::ByNameAndSize);
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(
        sets[0].paths(),
        vec![PathBuf::from("a/photo.jpg"), PathBuf::from("b/photo.jpg")]
    );
}

#[test]
fn test_by_name_never_ambiguous() {
    let dir = tempdir().unwrap();
    write(&dir, "a/x.bin", b"AAAA");
    write(&dir, "b/x.bin", b"BBBB");
    write(&dir, "c/x.bin", b"AAAA");
    write(&dir, "d/x.bin", b"BBBB");

    let config = FinderConfig::default().with_mode(GroupingMode::ByNameAndSize);
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 2);
}

#[test]
fn test_repeated_runs_identical() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        write(&dir, &format!("d{i}/same.txt"), b"shared content");
        write(&dir, &format!("d{i}/own.txt"), format!("own {i}").as_bytes());
    }

    let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(3));
    let (first, _) = finder.find_duplicates(dir.path()).unwrap();
    let (second, _) = finder.find_duplicates(dir.path()).unwrap();

    let paths = |sets: &[dedupe::duplicates::DuplicateSet]| {
        sets.iter().map(|s| s.paths()).collect::<Vec<_>>()
    };
    assert_eq!(paths(&first), paths(&second));
    assert_eq!(first[0].keep().path, PathBuf::from("d0/same.txt"));
}

#[test]
fn test_keep_ignores_modification_time() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a.txt", b"same");
    let b = write(&dir, "b.txt", b"same");

    // Make the first file in walk order the newest
    filetime::set_file_mtime(&a, filetime::FileTime::from_unix_time(2_000_000_000, 0)).unwrap();
    filetime::set_file_mtime(&b, filetime::FileTime::from_unix_time(1_000_000_000, 0)).unwrap();

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets[0].keep().path, PathBuf::from("a.txt"));
}

#[test]
fn test_empty_files_are_duplicates_unless_skipped() {
    let dir = tempdir().unwrap();
    write(&dir, "a.empty", b"");
    write(&dir, "b.empty", b"");

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].size(), 0);

    let config =
        FinderConfig::default().with_walker_config(WalkerConfig::default().with_skip_empty(true));
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    assert!(sets.is_empty());
}

#[test]
fn test_reserved_artifacts_ignored() {
    let dir = tempdir().unwrap();
    write(&dir, "a/.DS_Store", b"finder");
    write(&dir, "b/.DS_Store", b"finder");
    write(&dir, "@eaDir/thumb.jpg", b"thumb");
    write(&dir, "photos/@eaDir/thumb.jpg", b"thumb");

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(sets.is_empty());
    assert_eq!(summary.total_files, 0);
}

#[test]
fn test_invalid_root() {
    let result = DuplicateFinder::with_defaults().find_duplicates(Path::new("/nonexistent/root"));
    assert!(matches!(result, Err(FinderError::InvalidRoot(_))));
}

#[test]
fn test_invalid_glob_is_config_error() {
    let dir = tempdir().unwrap();
    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::default().with_patterns(vec!["a[".to_string()]));

    let result = DuplicateFinder::new(config).find_duplicates(dir.path());
    assert!(matches!(result, Err(FinderError::Config(_))));
}

#[test]
fn test_shutdown_before_scan_is_interrupted() {
    let dir = tempdir().unwrap();
    write(&dir, "a.txt", b"same");
    write(&dir, "b.txt", b"same");

    let flag = Arc::new(AtomicBool::new(true));
    let config = FinderConfig::default().with_shutdown_flag(flag);

    let result = DuplicateFinder::new(config).find_duplicates(dir.path());
    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(&dir, "a.txt", b"same");
    write(&dir, "b.txt", b"same");
    let locked = write(&dir, "c.txt", b"same");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits
    if fs::read(&locked).is_ok() {
        return;
    }

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(summary.unreadable_files, 1);
    assert_eq!(sets.len(), 1);
    assert_eq!(
        sets[0].paths(),
        vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdir_counted_and_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(&dir, "a.txt", b"same");
    write(&dir, "z/b.txt", b"same");
    write(&dir, "sub/c.txt", b"same");
    let locked = dir.path().join("sub");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = DuplicateFinder::with_defaults().find_duplicates(dir.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let (sets, summary) = result.unwrap();
    assert!(summary.scan_errors >= 1);
    assert_eq!(summary.total_files, 2);
    assert_eq!(sets.len(), 1);
    assert_eq!(
        sets[0].paths(),
        vec![PathBuf::from("a.txt"), PathBuf::from("z/b.txt")]
    );
}

#[cfg(unix)]
#[test]
fn test_unlistable_root_is_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(&dir, "locked/a.txt", b"same");
    let root = dir.path().join("locked");
    fs::set_permissions(&root, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&root).is_ok() {
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = DuplicateFinder::with_defaults().find_duplicates(&root);
    fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(FinderError::InvalidRoot(_))));
}

/// Treats a first line starting with `meta:` as the file's metadata.
#[derive(Debug)]
struct HeaderExtractor;

impl MetadataExtractor for HeaderExtractor {
    fn extract(&self, path: &Path) -> Result<String, MetadataError> {
        let content =
            fs::read_to_string(path).map_err(|_| MetadataError::NotAnImage(path.to_path_buf()))?;
        content
            .lines()
            .next()
            .filter(|line| line.starts_with("meta:"))
            .map(ToString::to_string)
            .ok_or_else(|| MetadataError::NoExif(path.to_path_buf()))
    }
}

fn metadata_finder() -> DuplicateFinder {
    DuplicateFinder::new(
        FinderConfig::default()
            .with_policy(FingerprintPolicy::MetadataFirst)
            .with_extractor(Arc::new(HeaderExtractor)),
    )
}

#[test]
fn test_metadata_first_matches_on_metadata() {
    let dir = tempdir().unwrap();
    // Same metadata line, different trailing bytes, same size
    write(&dir, "a.jpg", b"meta:cam1\nAAAA");
    write(&dir, "b.jpg", b"meta:cam1\nBBBB");

    let (sets, summary) = metadata_finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].domain(), HashDomain::Metadata);
    assert_eq!(summary.metadata_fingerprints, 2);
}

#[test]
fn test_metadata_first_mixed_group_falls_back_to_content() {
    let dir = tempdir().unwrap();
    write(&dir, "a.jpg", b"meta:cam1\nAAAA");
    write(&dir, "b.jpg", b"meta:cam1\nAAAA");
    write(&dir, "c.jpg", b"plain text xxx");

    let (sets, summary) = metadata_finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].domain(), HashDomain::Content);
    assert_eq!(sets[0].len(), 2);
    assert_eq!(summary.domain_fallback_groups, 1);
    assert_eq!(summary.metadata_fingerprints, 0);
}

#[test]
fn test_metadata_first_ignored_in_name_mode() {
    let dir = tempdir().unwrap();
    write(&dir, "a/x.jpg", b"meta:cam1\nAAAA");
    write(&dir, "b/x.jpg", b"meta:cam1\nBBBB");

    let config = FinderConfig::default()
        .with_mode(GroupingMode::ByNameAndSize)
        .with_policy(FingerprintPolicy::MetadataFirst)
        .with_extractor(Arc::new(HeaderExtractor));
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(sets.is_empty());
}

/// Small JPEG carrying an APP1 `Exif` segment whose IFD is followed by `tag`.
fn photo(tag: &[u8]) -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 8, |x, y| image::Rgb([x as u8 * 16, y as u8 * 32, 64]));
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
        .unwrap();

    let mut exif = b"II*\0\x08\0\0\0\0\0\0\0\0\0".to_vec();
    exif.extend_from_slice(tag);
    let segment_len = u16::try_from(2 + 6 + exif.len()).unwrap();

    let mut out = encoded[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&exif);
    out.extend_from_slice(&encoded[2..]);
    out
}

#[test]
fn test_metadata_first_real_jpeg_exif() {
    let dir = tempdir().unwrap();
    let original = photo(b"CAM-0001");

    // Same size and EXIF, one byte of image data changed
    let mut edited = original.clone();
    let mut pos = edited.len() - 3;
    while edited[pos] == 0xFF || edited[pos - 1] == 0xFF {
        pos -= 1;
    }
    edited[pos] = if edited[pos] == 0x10 { 0x20 } else { 0x10 };

    fs::write(dir.path().join("a.jpg"), &original).unwrap();
    fs::write(dir.path().join("b.jpg"), &edited).unwrap();
    // Same size, other camera
    fs::write(dir.path().join("c.jpg"), photo(b"CAM-0002")).unwrap();

    let config = FinderConfig::default().with_policy(FingerprintPolicy::MetadataFirst);
    let (sets, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].domain(), HashDomain::Metadata);
    assert_eq!(
        sets[0].paths(),
        vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]
    );
    assert_eq!(summary.metadata_fingerprints, 3);
    assert_eq!(summary.domain_fallback_groups, 0);

    // By content nothing matches
    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert!(sets.is_empty());
}
