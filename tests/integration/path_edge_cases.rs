use dedupe::duplicates::{DuplicateFinder, FinderConfig, GroupingMode};
use dedupe::output::ScriptOutput;
use dedupe::plan::DeletionPlan;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_spaces_and_quotes_in_names() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("my photos")).unwrap();
    fs::write(dir.path().join("my photos/it's \"one\".jpg"), b"same").unwrap();
    fs::write(dir.path().join("my photos/$copy.jpg"), b"same").unwrap();

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(sets.len(), 1);

    let plan = DeletionPlan::build(&summary.root, &[], sets);
    let mut script = Vec::new();
    ScriptOutput::new(&plan).write_to(&mut script).unwrap();
    let script = String::from_utf8(script).unwrap();

    // `$` sorts before `i`, so the dollar file is kept
    assert!(script.contains("# Keep: \""));
    assert!(script.contains("my photos/\\$copy.jpg\"\n"));
    assert!(script.contains("rm \""));
    assert!(script.contains("it's \\\"one\\\".jpg\"\n"));
}

#[test]
fn test_unicode_names() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("ファイル.txt"), b"same").unwrap();
    fs::write(dir.path().join("файл.txt"), b"same").unwrap();

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
}

#[test]
fn test_name_mode_matches_nfc_and_nfd() {
    let dir = tempdir().unwrap();
    // "café" precomposed vs decomposed
    let nfc = "caf\u{e9}.txt";
    let nfd = "cafe\u{301}.txt";
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a").join(nfc), b"same").unwrap();
    fs::write(dir.path().join("b").join(nfd), b"same").unwrap();

    // Some filesystems normalize on write; then both names are identical anyway
    let config = FinderConfig::default().with_mode(GroupingMode::ByNameAndSize);
    let (sets, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].keep().path.parent(), Some(PathBuf::from("a").as_path()));
}

#[test]
fn test_hidden_files_are_scanned() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), b"same").unwrap();
    fs::write(dir.path().join("visible"), b"same").unwrap();

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].keep().path, PathBuf::from(".hidden"));
}

#[test]
fn test_deeply_nested() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("a/b/c/d/e/f/g/h");
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("x.bin"), b"nested").unwrap();
    fs::write(dir.path().join("x.bin"), b"nested").unwrap();

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].keep().path, PathBuf::from("a/b/c/d/e/f/g/h/x.bin"));
}
