use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default directory receiving downloaded and consolidated reports.
pub const DEFAULT_DOWNLOAD_DIR: &str = "/app/downloads";
/// Default directory receiving browser screenshots.
pub const DEFAULT_SCREENSHOT_DIR: &str = "/app/screenshots";
/// Default tracing filter applied when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Read-only configuration shared by every file operation.
///
/// The settings are constructed once at startup and handed to
/// [`FileManager::new`](crate::files::FileManager::new); nothing in the crate
/// mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flat directory holding downloads and consolidated outputs.
    pub download_dir: PathBuf,
    /// Directory holding screenshots captured by the caller.
    pub screenshot_dir: PathBuf,
    /// Tracing filter directive such as `info` or `report_tools=debug`.
    pub log_level: String,
}

impl Settings {
    /// Builds settings rooted at the provided directories with the default log level.
    pub fn new(download_dir: impl Into<PathBuf>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            screenshot_dir: screenshot_dir.into(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_DIR, DEFAULT_SCREENSHOT_DIR)
    }
}
