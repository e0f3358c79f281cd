//! Lifecycle of the download directory: creation, listing, renaming,
//! retention cleanup and consolidation into it.

use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::reports::tools::config::Settings;
use crate::reports::tools::consolidate::{self, ConsolidationJob, ConsolidationReport};
use crate::reports::tools::error::{Result, ToolError};
use crate::reports::tools::naming::{self, MAX_NAME_ATTEMPTS};
use crate::reports::tools::validate;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Snapshot of a file's metadata taken when it was inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    /// ISO-8601 creation time; falls back to the modification time where the
    /// platform does not record creation.
    pub created_at: String,
    pub modified_at: String,
}

/// What [`FileManager::rename_download`] does when the target name is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Refuse with [`ToolError::FileExists`].
    Fail,
    /// Remove the existing file, then move. Last writer wins.
    #[default]
    Overwrite,
    /// Keep the existing file and pick `{stem}_{n}.{ext}` instead.
    AutoRename,
}

/// Owns the report directories. Construct one at startup and share it by
/// reference; it holds no mutable state.
#[derive(Debug, Clone)]
pub struct FileManager {
    settings: Settings,
}

impl FileManager {
    /// Creates the manager and makes sure its directories exist.
    pub fn new(settings: Settings) -> Result<Self> {
        let manager = Self { settings };
        manager.ensure_directories()?;
        Ok(manager)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn download_dir(&self) -> &Path {
        &self.settings.download_dir
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.settings.screenshot_dir
    }

    /// Creates the download and screenshot directories when absent. Safe to
    /// call repeatedly and from racing callers.
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(self.download_dir())?;
        fs::create_dir_all(self.screenshot_dir())?;
        debug!(
            download_dir = %self.download_dir().display(),
            screenshot_dir = %self.screenshot_dir().display(),
            "directories verified"
        );
        Ok(())
    }

    /// Builds a timestamped report file name; see
    /// [`naming::build_report_filename`].
    pub fn generate_filename(
        &self,
        report_type: &str,
        tenant_name: &str,
        period: Option<&str>,
        extension: &str,
    ) -> String {
        naming::build_report_filename(report_type, tenant_name, period, extension)
    }

    /// Moves `original` into the download directory as `new_filename`.
    #[instrument(level = "info", skip(self, original), fields(original = %original.display()))]
    pub fn rename_download(
        &self,
        original: &Path,
        new_filename: &str,
        policy: OverwritePolicy,
    ) -> Result<PathBuf> {
        if !original.exists() {
            return Err(ToolError::FileNotFound(original.to_path_buf()));
        }
        ensure_plain_file_name(new_filename)?;

        let mut target = self.download_dir().join(new_filename);
        if same_file(original, &target) {
            return Ok(target);
        }

        if target.exists() {
            match policy {
                OverwritePolicy::Fail => return Err(ToolError::FileExists(target)),
                OverwritePolicy::Overwrite => {
                    warn!(path = %target.display(), "file already exists, will overwrite");
                    fs::remove_file(&target)?;
                }
                OverwritePolicy::AutoRename => {
                    target = next_free_path(&target)?;
                }
            }
        }

        move_file(original, &target)?;
        info!(new = %target.display(), "file renamed");
        Ok(target)
    }

    /// Returns a metadata snapshot for `path`.
    pub fn file_info(&self, path: &Path) -> Result<FileRecord> {
        if !path.exists() {
            return Err(ToolError::FileNotFound(path.to_path_buf()));
        }
        let metadata = fs::metadata(path)?;
        Ok(file_record(path, &metadata))
    }

    /// Lists regular files in the download directory, newest first. Files
    /// whose metadata cannot be read are logged and skipped.
    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(self.download_dir())? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "error reading directory entry");
                    continue;
                }
            };
            let path = entry.path();
            match fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => {
                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    files.push((modified, file_record(&path, &metadata)));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        filename = %entry.file_name().to_string_lossy(),
                        error = %err,
                        "error getting file info"
                    );
                }
            }
        }

        files.sort_by(|(lhs, _), (rhs, _)| rhs.cmp(lhs));
        Ok(files.into_iter().map(|(_, record)| record).collect())
    }

    /// Deletes regular files in the download directory last modified more
    /// than `max_age_days` ago and returns how many were removed.
    pub fn cleanup(&self, max_age_days: u32) -> Result<usize> {
        let age = Duration::from_secs(u64::from(max_age_days) * SECONDS_PER_DAY);
        match SystemTime::now().checked_sub(age) {
            Some(cutoff) => self.cleanup_before(cutoff),
            None => Ok(0),
        }
    }

    /// Deletes regular files modified strictly before `cutoff`. Failures on
    /// individual files are logged and do not stop the sweep.
    #[instrument(level = "info", skip(self))]
    pub fn cleanup_before(&self, cutoff: SystemTime) -> Result<usize> {
        let now = SystemTime::now();
        let mut deleted = 0;

        for entry in fs::read_dir(self.download_dir())? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            let modified = match fs::metadata(&path) {
                Ok(metadata) if !metadata.is_file() => continue,
                Ok(metadata) => metadata.modified(),
                Err(err) => Err(err),
            };
            let modified = match modified {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "error reading file age");
                    continue;
                }
            };

            if modified >= cutoff {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    let age_days = now
                        .duration_since(modified)
                        .map(|age| age.as_secs() / SECONDS_PER_DAY)
                        .unwrap_or(0);
                    info!(
                        filename = %entry.file_name().to_string_lossy(),
                        age_days,
                        "deleted old file"
                    );
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to delete old file");
                }
            }
        }

        Ok(deleted)
    }

    /// See [`validate::validate_spreadsheet`].
    pub fn validate(&self, path: &Path) -> bool {
        validate::validate_spreadsheet(path)
    }

    /// Runs a consolidation job writing into the download directory.
    pub fn consolidate(&self, job: &ConsolidationJob) -> Result<ConsolidationReport> {
        consolidate::consolidate(job, self.download_dir())
    }
}

/// Rejects names that would escape the flat download directory.
pub(crate) fn ensure_plain_file_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(ToolError::InvalidFileName(name.to_string())),
    }
}

fn file_record(path: &Path, metadata: &Metadata) -> FileRecord {
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = metadata.created().unwrap_or(modified);
    FileRecord {
        path: path.to_path_buf(),
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        created_at: iso_timestamp(created),
        modified_at: iso_timestamp(modified),
    }
}

fn iso_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn same_file(lhs: &Path, rhs: &Path) -> bool {
    match (lhs.canonicalize(), rhs.canonicalize()) {
        (Ok(lhs), Ok(rhs)) => lhs == rhs,
        _ => false,
    }
}

fn next_free_path(taken: &Path) -> Result<PathBuf> {
    let stem = taken
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = taken.extension().map(|ext| ext.to_string_lossy().into_owned());

    for counter in 1..=MAX_NAME_ATTEMPTS {
        let name = match &extension {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = taken.with_file_name(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(ToolError::FileExists(taken.to_path_buf()))
}

/// Renames, falling back to copy-and-remove when the rename crosses devices.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            debug!(error = %err, "rename crosses devices, copying instead");
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
