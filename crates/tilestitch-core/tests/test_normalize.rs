mod common;

use std::collections::BTreeSet;

use tilestitch_core::coords::{
    normalize, read_canonical, read_raw_table, write_canonical, RawCoordinateRecord,
};
use tilestitch_core::error::StitchError;

use common::{acquisition_dir, grid_coordinates, write_coordinates, RAW_HEADER};

fn normalize_csv(contents: &str) -> tilestitch_core::coords::CanonicalTable {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    write_coordinates(&input, contents);
    let raw = read_raw_table(&input.join("0").join("coordinates.csv")).unwrap();
    normalize(&raw)
}

fn fovs(table: &tilestitch_core::coords::CanonicalTable) -> Vec<u64> {
    table.records.iter().map(|r| r.fov).collect()
}

#[test]
fn test_three_row_example() {
    let table = normalize_csv(
        "region,i,j,z_level,x (mm),y (mm),z (um)\n\
         A1,0,0,0,1.0,1.0,0\n\
         A1,0,1,0,2.0,1.0,0\n\
         A1,1,0,0,1.0,2.0,0\n",
    );
    assert_eq!(table.grid_columns, 2);
    assert_eq!(fovs(&table), vec![0, 1, 2]);
    assert_eq!(table.records[1].x_mm, 2.0);
    assert_eq!(table.records[2].y_mm, 2.0);
}

#[test]
fn test_dense_grid_covers_every_fov_once() {
    let table = normalize_csv(&grid_coordinates(&["A1"], 3, 4, 0.5));
    assert_eq!(table.len(), 12);
    let unique: BTreeSet<u64> = fovs(&table).into_iter().collect();
    assert_eq!(unique, (0..12).collect());
}

#[test]
fn test_one_output_row_per_input_row() {
    // Two z-levels of the same grid position: same FOV, both rows kept.
    let table = normalize_csv(&format!(
        "{RAW_HEADER}\nA1,0,0,0,0,0,1.0,0\nA1,0,0,1,0,0,2.0,0\nA1,0,1,0,1,0,1.0,0\n"
    ));
    assert_eq!(table.len(), 3);
    assert_eq!(fovs(&table), vec![0, 0, 1]);
    assert_eq!(table.records[1].z_level, 1);
    assert_eq!(table.unique_fovs(), 2);
    assert_eq!(table.z_levels(), vec![0, 1]);
}

#[test]
fn test_missing_j_reads_as_zero() {
    let table = normalize_csv(&format!(
        "{RAW_HEADER}\nA1,0,2,0,0,0,0,0\nA1,1,,0,0,0,0,0\nA1,2,,0,0,0,0,0\n"
    ));
    assert_eq!(table.grid_columns, 3);
    assert_eq!(fovs(&table), vec![2, 3, 6]);
}

#[test]
fn test_max_j_is_global_across_regions() {
    let table = normalize_csv(&format!(
        "{RAW_HEADER}\nA1,0,3,0,0,0,0,0\nB2,0,0,0,0,0,0,0\nB2,1,1,0,0,0,0,0\n"
    ));
    assert_eq!(table.grid_columns, 4);
    assert_eq!(fovs(&table), vec![3, 0, 5]);
    assert_eq!(table.regions(), vec!["A1", "B2"]);
    assert_eq!(table.grid_position(5), (1, 1));
}

#[test]
fn test_largest_column_index_keeps_grid_positions() {
    let raw = |i, j| RawCoordinateRecord {
        region: "A1".to_string(),
        i,
        j,
        z_level: 0,
        x_mm: 0.0,
        y_mm: 0.0,
        z_um: 0.0,
    };
    let table = normalize(&[raw(0, u32::MAX), raw(3, 7)]);
    assert_eq!(table.grid_columns, 1 << 32);
    assert_eq!(table.grid_position(table.records[0].fov), (0, u64::from(u32::MAX)));
    assert_eq!(table.grid_position(table.records[1].fov), (3, 7));
}

#[test]
fn test_column_order_free_and_extra_columns_ignored() {
    let table = normalize_csv(
        "time,z (um),y (mm),x (mm),z_level,j,i,region,z_piezo (um)\n\
         9.5,3.25,2.5,1.5,0,1,1,C3,0.0\n",
    );
    let record = &table.records[0];
    assert_eq!(record.region, "C3");
    assert_eq!(record.fov, 3);
    assert_eq!(record.x_mm, 1.5);
    assert_eq!(record.y_mm, 2.5);
    assert_eq!(record.z_um, 3.25);
}

#[test]
fn test_float_indices_truncate() {
    let table = normalize_csv(&format!("{RAW_HEADER}\nA1,1.0,1.0,2.0,0,0,0,0\n"));
    assert_eq!(table.records[0].fov, 3);
    assert_eq!(table.records[0].z_level, 2);
}

#[test]
fn test_missing_columns_are_all_named() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    write_coordinates(&input, "region,i,z_level,x (mm),y (mm)\nA1,0,0,0,0\n");

    let err = read_raw_table(&input.join("0").join("coordinates.csv")).unwrap_err();
    match err {
        StitchError::MissingColumns { columns, .. } => {
            assert_eq!(columns, vec!["j".to_string(), "z (um)".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn test_invalid_index_names_column_and_line() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    write_coordinates(
        &input,
        &format!("{RAW_HEADER}\nA1,0,0,0,0,0,0,0\nA1,x,0,0,0,0,0,0\n"),
    );

    let err = read_raw_table(&input.join("0").join("coordinates.csv")).unwrap_err();
    match err {
        StitchError::InvalidValue {
            column, line, value, ..
        } => {
            assert_eq!(column, "i");
            assert_eq!(line, 3);
            assert_eq!(value, "x");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn test_negative_index_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    write_coordinates(&input, &format!("{RAW_HEADER}\nA1,0,-2,0,0,0,0,0\n"));

    let err = read_raw_table(&input.join("0").join("coordinates.csv")).unwrap_err();
    assert!(matches!(err, StitchError::InvalidValue { column: "j", .. }), "{err:?}");
}

#[test]
fn test_empty_position_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = acquisition_dir(tmp.path(), "acq");
    write_coordinates(&input, &format!("{RAW_HEADER}\nA1,0,0,0,,0,0,0\n"));

    let err = read_raw_table(&input.join("0").join("coordinates.csv")).unwrap_err();
    assert!(
        matches!(err, StitchError::InvalidValue { column: "x (mm)", .. }),
        "{err:?}"
    );
}

#[test]
fn test_missing_file_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("0").join("coordinates.csv");
    let err = read_raw_table(&path).unwrap_err();
    match err {
        StitchError::NotFound { path: missing, .. } => assert_eq!(missing, path),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_header_only_table() {
    let table = normalize_csv(&format!("{RAW_HEADER}\n"));
    assert!(table.is_empty());
    assert_eq!(table.grid_columns, 1);
}

#[test]
fn test_canonical_csv_is_byte_identical_across_runs() {
    let contents = grid_coordinates(&["A1", "B2"], 2, 3, 0.25);
    let first = normalize_csv(&contents);
    let second = normalize_csv(&contents);
    assert_eq!(first, second);

    let mut a = Vec::new();
    let mut b = Vec::new();
    write_canonical(&first, &mut a).unwrap();
    write_canonical(&second, &mut b).unwrap();
    assert_eq!(a, b);

    let text = String::from_utf8(a).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("region,fov,z_level,x (mm),y (mm),z (um)"));
    assert_eq!(lines.next(), Some("A1,0,0,0.0,0.0,1.5"));
    assert_eq!(lines.count(), 11);
}

#[test]
fn test_canonical_csv_reads_back() {
    let tmp = tempfile::tempdir().unwrap();
    let table = normalize_csv(&grid_coordinates(&["A1"], 2, 2, 1.0));
    let path = tmp.path().join("canonical.csv");
    write_canonical(&table, std::fs::File::create(&path).unwrap()).unwrap();

    let read = read_canonical(&path, table.grid_columns).unwrap();
    assert_eq!(read, table);
}
