use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use report_tools::io::excel_read;
use report_tools::model::CellValue;
use rust_xlsxwriter::{Color, Format, Workbook};
use tempfile::tempdir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

const STYLES_PART: &str = "xl/styles.xml";

fn write_coloured(dir: &Path) -> PathBuf {
    let path = dir.join("coloured.xlsx");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let red = Format::new().set_bold().set_font_color(Color::RGB(0xFF0000));
    worksheet
        .write_string_with_format(0, 0, "alert", &red)
        .expect("cell written");
    workbook.save(&path).expect("fixture saved");
    path
}

/// Copies the package at `path`, passing `xl/styles.xml` through `edit`.
fn rewrite_styles(path: &Path, target: &Path, edit: impl Fn(&str) -> String) {
    let mut archive = ZipArchive::new(File::open(path).expect("fixture opened")).expect("zip");
    let mut writer = ZipWriter::new(File::create(target).expect("target created"));

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).expect("zip entry");
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).expect("entry read");
        if name == STYLES_PART {
            let xml = String::from_utf8(bytes).expect("utf-8 styles");
            bytes = edit(&xml).into_bytes();
        }
        writer
            .start_file(name, SimpleFileOptions::default())
            .expect("entry started");
        writer.write_all(&bytes).expect("entry written");
    }
    writer.finish().expect("zip finished");
}

#[test]
fn explicit_font_colours_are_read() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = write_coloured(temp_dir.path());

    let workbook = excel_read::read_workbook(&path).expect("workbook read");
    let style = workbook.sheets[0]
        .cell(0, 0)
        .and_then(|cell| cell.style.as_ref())
        .expect("styled cell");

    assert!(style.font.bold);
    assert_eq!(style.font.color, Some(0xFF0000));
}

#[test]
fn malformed_colours_are_ignored_instead_of_failing() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = write_coloured(temp_dir.path());
    let patched = temp_dir.path().join("patched.xlsx");
    rewrite_styles(&source, &patched, |xml| {
        assert!(xml.contains("rgb=\"FFFF0000\""), "fixture has an explicit colour");
        xml.replace("rgb=\"FFFF0000\"", "rgb=\"a\u{e9}\u{e9}\u{e9}b\"")
    });

    let workbook = excel_read::read_workbook(&patched).expect("workbook read");
    let cell = workbook.sheets[0].cell(0, 0).expect("cell present");

    assert_eq!(cell.value, CellValue::String("alert".to_string()));
    let style = cell.style.as_ref().expect("style kept");
    assert!(style.font.bold);
    assert_eq!(style.font.color, None);
    assert!(fs::metadata(&source).is_ok());
}
