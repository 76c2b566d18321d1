use std::fs;
use std::path::Path;

use cartoexport::contact_force::{ContactForceExport, DEFAULT_COLUMNS};
use cartoexport::ExportError;

fn cleanup_test_file(filename: &str) {
    if Path::new(filename).exists() {
        fs::remove_file(filename).ok();
    }
}

/// Builds a contact-force export whose force column equals the sample index
/// and whose angles are constant.
fn contact_force_text(rows: usize) -> String {
    let mut text = String::new();
    for i in 0..8 {
        text.push_str(&format!("Header line {i}\n"));
    }
    for i in 0..rows {
        let time = i as f64 - 150.0;
        let timestamp = 171_000 + i * 17;
        text.push_str(&format!("{i} {time} {timestamp} {} 30.25 -12.5 0 0 0\n", i as f64));
    }
    text
}

#[test]
fn test_default_window_extracts_positive_time_tail() {
    let filename = "test_cf_default.txt";
    fs::write(filename, contact_force_text(200)).unwrap();

    let export = ContactForceExport::open(filename).unwrap();
    assert_eq!(export.samples(), 200);
    assert_eq!(export.columns(), 9);

    let window = export.default_window().unwrap();
    assert_eq!(window.shape(), &[3, 50]);
    // Force column mirrors the sample index, so the window starts at 150.
    assert_eq!(window[[0, 0]], 150.0);
    assert_eq!(window[[0, 49]], 199.0);
    assert_eq!(window[[1, 0]], 30.25);
    assert_eq!(window[[2, 0]], -12.5);

    cleanup_test_file(filename);
}

#[test]
fn test_custom_columns_and_window() {
    let filename = "test_cf_custom.txt";
    fs::write(filename, contact_force_text(200)).unwrap();

    let export = ContactForceExport::open(filename).unwrap();
    // Relative time and force over the first ten samples.
    let window = export.window(&[1, 3], 0, 10).unwrap();
    assert_eq!(window.shape(), &[2, 10]);
    assert_eq!(window[[0, 0]], -150.0);
    assert_eq!(window[[1, 9]], 9.0);

    cleanup_test_file(filename);
}

#[test]
fn test_201_sample_file_still_windows_to_50() {
    let filename = "test_cf_201.txt";
    fs::write(filename, contact_force_text(201)).unwrap();

    let export = ContactForceExport::open(filename).unwrap();
    assert_eq!(export.samples(), 201);
    let window = export.window(&DEFAULT_COLUMNS, 150, 50).unwrap();
    assert_eq!(window.shape(), &[3, 50]);
    assert_eq!(window[[0, 49]], 199.0);

    cleanup_test_file(filename);
}

#[test]
fn test_short_file_errors_instead_of_truncating() {
    let filename = "test_cf_short.txt";
    fs::write(filename, contact_force_text(160)).unwrap();

    let export = ContactForceExport::open(filename).unwrap();
    let err = export.default_window().unwrap_err();
    assert!(matches!(err, ExportError::SampleRangeOutOfBounds { .. }));

    cleanup_test_file(filename);
}

#[test]
fn test_header_only_file() {
    let filename = "test_cf_empty.txt";
    let mut text = String::new();
    for i in 0..8 {
        text.push_str(&format!("Header line {i}\n"));
    }
    fs::write(filename, &text).unwrap();

    assert!(matches!(
        ContactForceExport::open(filename),
        Err(ExportError::TruncatedFile { .. })
    ));

    cleanup_test_file(filename);
}

#[test]
fn test_malformed_value_names_the_row() {
    let filename = "test_cf_badvalue.txt";
    let text = contact_force_text(20).replace("12 -138 171204", "12 x 171204");
    fs::write(filename, text).unwrap();

    match ContactForceExport::open(filename) {
        Err(ExportError::InvalidNumber { row, value }) => {
            assert_eq!(row, 12);
            assert_eq!(value, "x");
        }
        other => panic!("expected InvalidNumber, got {other:?}"),
    }

    cleanup_test_file(filename);
}
