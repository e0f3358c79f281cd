use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use report_tools::ToolError;
use report_tools::config::Settings;
use report_tools::files::{FileManager, OverwritePolicy};
use tempfile::{TempDir, tempdir};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn manager(temp_dir: &TempDir) -> FileManager {
    let settings = Settings::new(
        temp_dir.path().join("downloads"),
        temp_dir.path().join("screenshots"),
    );
    FileManager::new(settings).expect("file manager")
}

fn write_aged(dir: &Path, name: &str, age: Duration) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, name.as_bytes()).expect("fixture written");
    let modified = SystemTime::now() - age;
    File::options()
        .write(true)
        .open(&path)
        .and_then(|file| file.set_modified(modified))
        .expect("modification time set");
    path
}

#[test]
fn ensure_directories_is_idempotent_and_race_safe() {
    let temp_dir = tempdir().expect("temporary directory");
    let settings = Settings::new(
        temp_dir.path().join("nested/downloads"),
        temp_dir.path().join("nested/screenshots"),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let settings = settings.clone();
            thread::spawn(move || FileManager::new(settings).map(|_| ()))
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .expect("thread joined")
            .expect("directories created");
    }

    let manager = FileManager::new(settings.clone()).expect("file manager");
    manager.ensure_directories().expect("second call succeeds");
    assert!(settings.download_dir.is_dir());
    assert!(settings.screenshot_dir.is_dir());
}

#[test]
fn cleanup_removes_only_files_past_the_retention_period() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let dir = manager.download_dir().to_path_buf();

    let oldest = write_aged(&dir, "old.xlsx", DAY * 40);
    let recent = write_aged(&dir, "recent.xlsx", DAY * 20);
    let fresh = write_aged(&dir, "fresh.xlsx", DAY);

    let deleted = manager.cleanup(30).expect("cleanup");

    assert_eq!(deleted, 1);
    assert!(!oldest.exists());
    assert!(recent.exists());
    assert!(fresh.exists());
}

#[test]
fn cleanup_ignores_directories() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let nested = manager.download_dir().join("archive");
    fs::create_dir(&nested).expect("nested directory");

    assert_eq!(manager.cleanup(0).expect("cleanup"), 0);
    assert!(nested.is_dir());
}

#[test]
fn list_files_returns_newest_first_and_skips_directories() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let dir = manager.download_dir().to_path_buf();

    write_aged(&dir, "middle.xlsx", DAY * 2);
    write_aged(&dir, "newest.xlsx", DAY);
    write_aged(&dir, "oldest.xlsx", DAY * 3);
    fs::create_dir(dir.join("subdir")).expect("subdirectory");

    let files = manager.list_files().expect("listing");
    let names: Vec<&str> = files.iter().map(|record| record.filename.as_str()).collect();

    assert_eq!(names, vec!["newest.xlsx", "middle.xlsx", "oldest.xlsx"]);
    assert_eq!(files[0].size, "newest.xlsx".len() as u64);
    assert_eq!(files[0].path, dir.join("newest.xlsx"));
}

#[test]
fn file_info_reports_metadata_as_iso_timestamps() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let path = manager.download_dir().join("report.xlsx");
    fs::write(&path, b"0123456789").expect("fixture written");

    let record = manager.file_info(&path).expect("file info");

    assert_eq!(record.filename, "report.xlsx");
    assert_eq!(record.size, 10);
    assert!(chrono::DateTime::parse_from_rfc3339(&record.modified_at).is_ok());
    assert!(chrono::DateTime::parse_from_rfc3339(&record.created_at).is_ok());

    let json = serde_json::to_value(&record).expect("record serialised");
    assert_eq!(json["filename"], "report.xlsx");
}

#[test]
fn file_info_fails_for_missing_files() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let missing = temp_dir.path().join("missing.xlsx");

    assert!(matches!(
        manager.file_info(&missing),
        Err(ToolError::FileNotFound(path)) if path == missing
    ));
}

#[test]
fn rename_moves_files_into_the_download_directory() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let original = temp_dir.path().join("download.tmp");
    fs::write(&original, b"payload").expect("fixture written");

    let renamed = manager
        .rename_download(&original, "Report.xlsx", OverwritePolicy::Overwrite)
        .expect("renamed");

    assert_eq!(renamed, manager.download_dir().join("Report.xlsx"));
    assert!(!original.exists());
    assert_eq!(fs::read(&renamed).expect("renamed file read"), b"payload");
}

#[test]
fn rename_overwrite_policy_replaces_existing_file() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let existing = manager.download_dir().join("Report.xlsx");
    fs::write(&existing, b"old").expect("existing written");
    let original = temp_dir.path().join("download.tmp");
    fs::write(&original, b"new").expect("fixture written");

    let renamed = manager
        .rename_download(&original, "Report.xlsx", OverwritePolicy::Overwrite)
        .expect("renamed");

    assert_eq!(renamed, existing);
    assert_eq!(fs::read(&existing).expect("file read"), b"new");
}

#[test]
fn rename_fail_policy_keeps_both_files() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let existing = manager.download_dir().join("Report.xlsx");
    fs::write(&existing, b"old").expect("existing written");
    let original = temp_dir.path().join("download.tmp");
    fs::write(&original, b"new").expect("fixture written");

    let result = manager.rename_download(&original, "Report.xlsx", OverwritePolicy::Fail);

    assert!(matches!(result, Err(ToolError::FileExists(path)) if path == existing));
    assert!(original.exists());
    assert_eq!(fs::read(&existing).expect("file read"), b"old");
}

#[test]
fn rename_auto_policy_picks_a_free_name() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let existing = manager.download_dir().join("Report.xlsx");
    fs::write(&existing, b"old").expect("existing written");
    fs::write(manager.download_dir().join("Report_1.xlsx"), b"older").expect("written");
    let original = temp_dir.path().join("download.tmp");
    fs::write(&original, b"new").expect("fixture written");

    let renamed = manager
        .rename_download(&original, "Report.xlsx", OverwritePolicy::AutoRename)
        .expect("renamed");

    assert_eq!(renamed, manager.download_dir().join("Report_2.xlsx"));
    assert_eq!(fs::read(&existing).expect("file read"), b"old");
    assert_eq!(fs::read(&renamed).expect("file read"), b"new");
}

#[test]
fn rename_rejects_missing_sources_and_nested_targets() {
    let temp_dir = tempdir().expect("temporary directory");
    let manager = manager(&temp_dir);
    let missing = temp_dir.path().join("missing.tmp");

    assert!(matches!(
        manager.rename_download(&missing, "Report.xlsx", OverwritePolicy::Overwrite),
        Err(ToolError::FileNotFound(_))
    ));

    let original = temp_dir.path().join("download.tmp");
    fs::write(&original, b"payload").expect("fixture written");
    assert!(matches!(
        manager.rename_download(&original, "../escape.xlsx", OverwritePolicy::Overwrite),
        Err(ToolError::InvalidFileName(_))
    ));
    assert!(original.exists());
}
