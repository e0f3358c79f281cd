use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::reports::tools::error::{Result, ToolError};
use crate::reports::tools::files::ensure_plain_file_name;
use crate::reports::tools::io::{excel_read, excel_write};
use crate::reports::tools::model::{Sheet, Workbook};
use crate::reports::tools::naming::{SheetNameRegistry, sanitize_sheet_name, truncate_chars};

/// Number of leading characters of a source file stem used in default sheet names.
pub const SOURCE_STEM_CHARS: usize = 15;

/// A single request to merge several source workbooks into one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationJob {
    /// Source workbooks, consolidated in this order.
    pub sources: Vec<PathBuf>,
    /// File name of the output inside the download directory.
    pub output_filename: String,
    /// Optional sheet-name prefixes, matched to sources by position.
    pub sheet_prefixes: Vec<String>,
}

impl ConsolidationJob {
    pub fn new(sources: Vec<PathBuf>, output_filename: impl Into<String>) -> Self {
        Self {
            sources,
            output_filename: output_filename.into(),
            sheet_prefixes: Vec::new(),
        }
    }

    /// Sets custom sheet-name prefixes; sources beyond the list's length fall
    /// back to the file-name based default.
    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.sheet_prefixes = prefixes;
        self
    }
}

/// Records which source sheet produced which output sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetMapping {
    pub source_path: PathBuf,
    pub source_sheet: String,
    pub target_sheet: String,
}

/// Outcome of a successful consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub output_path: PathBuf,
    pub sheet_count: usize,
    pub sheets: Vec<SheetMapping>,
}

/// Merges every sheet of every source into a new workbook written to
/// `download_dir/job.output_filename`.
///
/// The job is all-or-nothing: any missing or unreadable source aborts it
/// before the output is written, and sources are never modified.
#[instrument(
    level = "info",
    skip_all,
    fields(output = %job.output_filename, file_count = job.sources.len())
)]
pub fn consolidate(job: &ConsolidationJob, download_dir: &Path) -> Result<ConsolidationReport> {
    if job.sources.is_empty() {
        return Err(ToolError::EmptySourceList);
    }
    ensure_plain_file_name(&job.output_filename)?;
    if let Some(missing) = job.sources.iter().find(|path| !path.exists()) {
        return Err(ToolError::MissingSourceFile(missing.clone()));
    }
    let output_path = download_dir.join(&job.output_filename);
    ensure_output_is_not_source(&output_path, &job.sources)?;

    info!("consolidating Excel files");

    let mut output = Workbook::new();
    let mut registry = SheetNameRegistry::new();
    let mut mappings = Vec::new();

    for (index, source_path) in job.sources.iter().enumerate() {
        let source = excel_read::read_workbook(source_path).inspect_err(|err| {
            error!(file = %source_path.display(), error = %err, "error processing file");
        })?;
        let prefix = job.sheet_prefixes.get(index).map(String::as_str);

        for source_sheet in &source.sheets {
            let candidate =
                candidate_sheet_name(prefix, source_path, source.sheets.len(), &source_sheet.name);
            let target_name = registry.assign(&sanitize_sheet_name(&candidate))?;

            output.sheets.push(copy_sheet(source_sheet, target_name.clone()));
            debug!(source = %source_sheet.name, target = %target_name, "copied sheet");

            mappings.push(SheetMapping {
                source_path: source_path.clone(),
                source_sheet: source_sheet.name.clone(),
                target_sheet: target_name,
            });
        }
    }

    // The output starts without a placeholder sheet, so an empty result is
    // rejected instead of being padded.
    if output.sheets.is_empty() {
        return Err(ToolError::NoSheetsCopied);
    }

    excel_write::write_workbook(&output_path, &output)?;
    output.path = Some(output_path.clone());

    info!(
        output_path = %output_path.display(),
        total_sheets = output.sheets.len(),
        "consolidation complete"
    );

    Ok(ConsolidationReport {
        output_path,
        sheet_count: output.sheets.len(),
        sheets: mappings,
    })
}

/// Derives the unsanitised output name for one source sheet.
///
/// With a prefix, multi-sheet sources yield `{prefix}_{sheet}` and
/// single-sheet sources the bare prefix. Without one, the name is the first
/// [`SOURCE_STEM_CHARS`] characters of the source file stem joined to the
/// sheet name.
pub fn candidate_sheet_name(
    prefix: Option<&str>,
    source_path: &Path,
    source_sheet_count: usize,
    sheet_name: &str,
) -> String {
    match prefix {
        Some(prefix) if source_sheet_count > 1 => format!("{prefix}_{sheet_name}"),
        Some(prefix) => prefix.to_string(),
        None => {
            let stem = source_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{}_{sheet_name}", truncate_chars(&stem, SOURCE_STEM_CHARS))
        }
    }
}

/// Sources are written over by `persist`, so an output resolving to any of
/// them is refused.
fn ensure_output_is_not_source(output_path: &Path, sources: &[PathBuf]) -> Result<()> {
    let Ok(output) = output_path.canonicalize() else {
        // Nothing exists at the output path yet.
        return Ok(());
    };
    for source in sources {
        if source.canonicalize()? == output {
            return Err(ToolError::OutputIsSource(source.clone()));
        }
    }
    Ok(())
}

/// Copies values and styles first, then merges, then sizing. Positions
/// covered by a merge but not its anchor are skipped.
fn copy_sheet(source: &Sheet, name: String) -> Sheet {
    let mut target = Sheet::new(name);

    for (&(row, col), cell) in &source.cells {
        if source.merged_placeholder(row, col).is_some() {
            continue;
        }
        target.set_cell(row, col, cell.clone());
    }

    target.merged_ranges = source.merged_ranges.clone();
    target.column_widths = source.column_widths.clone();
    target.row_heights = source.row_heights.clone();
    target
}
