use std::fs;
use std::path::{Path, PathBuf};

use report_tools::validate::{ValidationFailure, inspect_spreadsheet, validate_spreadsheet};
use tempfile::tempdir;

fn write_file(dir: &Path, name: &str, header: &[u8], size: usize) -> PathBuf {
    let mut bytes = header.to_vec();
    bytes.resize(size, 0);
    let path = dir.join(name);
    fs::write(&path, bytes).expect("fixture written");
    path
}

#[test]
fn rejects_files_below_the_minimum_size() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = write_file(temp_dir.path(), "small.xlsx", b"PK", 500);

    assert!(!validate_spreadsheet(&path));
    assert_eq!(
        inspect_spreadsheet(&path),
        Err(ValidationFailure::TooSmall { size: 500 })
    );
}

#[test]
fn rejects_unrecognised_extensions() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = write_file(temp_dir.path(), "report.txt", b"PK", 2000);

    assert!(!validate_spreadsheet(&path));
    assert_eq!(
        inspect_spreadsheet(&path),
        Err(ValidationFailure::UnsupportedExtension)
    );
}

#[test]
fn rejects_files_without_the_zip_header() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = write_file(temp_dir.path(), "program.xlsx", b"MZ", 2000);

    assert!(!validate_spreadsheet(&path));
    assert_eq!(inspect_spreadsheet(&path), Err(ValidationFailure::BadMagic));
}

#[test]
fn accepts_zip_based_spreadsheets() {
    let temp_dir = tempdir().expect("temporary directory");
    let xlsx = write_file(temp_dir.path(), "report.xlsx", b"PK", 2000);
    let upper = write_file(temp_dir.path(), "REPORT.XLSX", b"PK\x03\x04", 2000);
    let xls = write_file(temp_dir.path(), "legacy.xls", b"PK", 2000);

    assert!(validate_spreadsheet(&xlsx));
    assert!(validate_spreadsheet(&upper));
    assert!(validate_spreadsheet(&xls));
}

#[test]
fn missing_files_are_invalid_rather_than_errors() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("absent.xlsx");

    assert!(!validate_spreadsheet(&path));
    assert_eq!(inspect_spreadsheet(&path), Err(ValidationFailure::Missing));
}

#[test]
fn directories_do_not_validate() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("folder.xlsx");
    fs::create_dir(&path).expect("directory created");
    // Reported size varies by filesystem, so only the verdict is checked.
    assert!(!validate_spreadsheet(&path));
}
