//! Sanity checks for downloaded spreadsheet files.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{error, warn};

/// Files smaller than this are presumed truncated.
pub const MIN_SPREADSHEET_SIZE: u64 = 1000;
/// Recognised spreadsheet extensions, compared case-insensitively.
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];
/// Leading bytes of a ZIP archive.
pub const ZIP_MAGIC: &[u8; 2] = b"PK";

/// Reason a file was rejected by [`inspect_spreadsheet`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("file does not exist")]
    Missing,
    #[error("file too small to be a valid spreadsheet ({size} bytes)")]
    TooSmall { size: u64 },
    #[error("file does not have a spreadsheet extension")]
    UnsupportedExtension,
    #[error("file does not start with the ZIP archive header")]
    BadMagic,
    #[error("file could not be read: {0}")]
    Unreadable(String),
}

/// Runs the existence, size, extension and header checks in that order and
/// reports the first one that fails.
pub fn inspect_spreadsheet(path: &Path) -> Result<(), ValidationFailure> {
    if !path.exists() {
        return Err(ValidationFailure::Missing);
    }

    let size = fs::metadata(path)
        .map_err(|err| ValidationFailure::Unreadable(err.to_string()))?
        .len();
    if size < MIN_SPREADSHEET_SIZE {
        return Err(ValidationFailure::TooSmall { size });
    }

    if !has_spreadsheet_extension(path) {
        return Err(ValidationFailure::UnsupportedExtension);
    }

    let header = read_header(path).map_err(|err| ValidationFailure::Unreadable(err.to_string()))?;
    if &header != ZIP_MAGIC {
        return Err(ValidationFailure::BadMagic);
    }

    Ok(())
}

/// Returns whether `path` looks like a well-formed ZIP-based spreadsheet.
///
/// Never fails: every rejection is logged with the check that failed and
/// reported as `false`.
pub fn validate_spreadsheet(path: &Path) -> bool {
    match inspect_spreadsheet(path) {
        Ok(()) => true,
        Err(ValidationFailure::Unreadable(reason)) => {
            error!(path = %path.display(), error = %reason, "error reading file");
            false
        }
        Err(ValidationFailure::TooSmall { size }) => {
            warn!(path = %path.display(), size, "file too small to be valid spreadsheet");
            false
        }
        Err(failure) => {
            warn!(path = %path.display(), reason = %failure, "spreadsheet validation failed");
            false
        }
    }
}

/// Returns whether the file starts with the ZIP header; unreadable files
/// count as not ZIP.
pub(crate) fn has_zip_magic(path: &Path) -> bool {
    matches!(read_header(path), Ok(header) if &header == ZIP_MAGIC)
}

fn has_spreadsheet_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn read_header(path: &Path) -> std::io::Result<[u8; 2]> {
    let mut header = [0u8; 2];
    File::open(path)?.read_exact(&mut header)?;
    Ok(header)
}
