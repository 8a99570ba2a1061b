mod common;

use std::fs;

use tilestitch_core::coords::{cache_key, write_canonical, CoordinateCache};
use tilestitch_core::error::StitchError;

use common::{acquisition_dir, grid_coordinates, write_coordinates};

#[test]
fn test_process_writes_digest_named_file() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    write_coordinates(&input, &grid_coordinates(&["A1"], 2, 2, 0.5));
    let cache = CoordinateCache::new(tmp.path().join("cache"));

    let processed = cache.process_coordinates(&input).unwrap();

    let name = processed.path.file_name().unwrap().to_str().unwrap();
    let key = name
        .strip_prefix("coordinates_processed_")
        .and_then(|rest| rest.strip_suffix(".csv"))
        .unwrap();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    assert_eq!(key, cache_key(&input).unwrap());
    assert_eq!(processed.path, cache.path_for(&input).unwrap());
    assert_eq!(processed.path.parent().unwrap(), cache.dir());

    let mut expected = Vec::new();
    write_canonical(&processed.table, &mut expected).unwrap();
    assert_eq!(fs::read(&processed.path).unwrap(), expected);
    assert_eq!(processed.table.len(), 4);
}

#[test]
fn test_same_folder_different_spelling_shares_key() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    let respelled = input.join("0").join("..");
    assert_eq!(cache_key(&input).unwrap(), cache_key(&respelled).unwrap());
}

#[test]
fn test_distinct_folders_get_distinct_files() {
    let tmp = tempfile::tempdir().unwrap();
    let a = acquisition_dir(tmp.path(), "plate_a");
    let b = acquisition_dir(tmp.path(), "plate_b");
    let cache = CoordinateCache::new(tmp.path().join("cache"));
    assert_ne!(cache.path_for(&a).unwrap(), cache.path_for(&b).unwrap());
}

#[test]
fn test_missing_coordinates_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    let cache_dir = tmp.path().join("cache");
    let cache = CoordinateCache::new(&cache_dir);

    let err = cache.process_coordinates(&input).unwrap_err();
    match err {
        StitchError::NotFound { path, .. } => {
            assert_eq!(path, input.join("0").join("coordinates.csv"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(!cache_dir.exists() || fs::read_dir(&cache_dir).unwrap().next().is_none());
}

#[test]
fn test_missing_input_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CoordinateCache::new(tmp.path().join("cache"));
    let err = cache
        .process_coordinates(&tmp.path().join("nowhere"))
        .unwrap_err();
    assert!(matches!(err, StitchError::NotFound { .. }), "{err:?}");
}

#[test]
fn test_schema_error_leaves_previous_cache_intact() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    let cache = CoordinateCache::new(tmp.path().join("cache"));

    write_coordinates(&input, &grid_coordinates(&["A1"], 1, 2, 0.5));
    let first = cache.process_coordinates(&input).unwrap();
    let before = fs::read(&first.path).unwrap();

    write_coordinates(&input, "region,i\nA1,0\n");
    let err = cache.process_coordinates(&input).unwrap_err();
    assert!(matches!(err, StitchError::MissingColumns { .. }), "{err:?}");
    assert_eq!(fs::read(&first.path).unwrap(), before);
}

#[test]
fn test_rerun_overwrites_without_leftovers() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    let cache_dir = tmp.path().join("cache");
    let cache = CoordinateCache::new(&cache_dir);

    write_coordinates(&input, &grid_coordinates(&["A1"], 1, 2, 0.5));
    let first = cache.process_coordinates(&input).unwrap();
    write_coordinates(&input, &grid_coordinates(&["A1"], 3, 3, 0.5));
    let second = cache.process_coordinates(&input).unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(second.table.len(), 9);
    let entries: Vec<_> = fs::read_dir(&cache_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let text = fs::read_to_string(&second.path).unwrap();
    assert_eq!(text.lines().count(), 10);
}
