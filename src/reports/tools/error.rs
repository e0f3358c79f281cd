use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while the
/// tool manages downloaded reports or consolidates workbooks.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures that are not tied to a specific output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a result fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when a consolidation job is submitted without any source files.
    #[error("no files provided for consolidation")]
    EmptySourceList,

    /// Raised when one of the consolidation sources does not exist.
    #[error("source file not found: {0}")]
    MissingSourceFile(PathBuf),

    /// Raised when a source cannot be parsed as a spreadsheet document.
    #[error("corrupt workbook {path}: {reason}")]
    CorruptWorkbook { path: PathBuf, reason: String },

    /// Raised when the consolidated output cannot be persisted.
    #[error("failed to write {path}: {source}")]
    IoWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised by rename and info operations when the path does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// Raised when a rename target is occupied and the policy forbids replacing it.
    #[error("file already exists: {0}")]
    FileExists(PathBuf),

    /// Raised when no free sheet name could be derived from a candidate.
    #[error("could not find a unique sheet name for '{name}' after {attempts} attempts")]
    SheetNameCollisionUnresolvable { name: String, attempts: usize },

    /// Raised when the output path names one of the job's own sources.
    #[error("output would overwrite source file: {0}")]
    OutputIsSource(PathBuf),

    /// Raised when every source was empty and the output would contain no sheets.
    #[error("consolidation produced no sheets")]
    NoSheetsCopied,

    /// Raised when an output or rename target is not a plain file name.
    #[error("invalid file name: '{0}'")]
    InvalidFileName(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ToolError::CorruptWorkbook {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
